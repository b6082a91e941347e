//! Integration tests for the scenario driver.

use std::cell::RefCell;
use std::rc::Rc;

use blit_readback::common::{
    BufferHandle, CacheMode, CachingStatus, DeviceError, ReadStrategy, ScenarioError,
};
use blit_readback::device::{GemDevice, Session, SimDevice, SimFault};
use blit_readback::scenario::{Geometry, Outcome, Scenario, Sources, SEQUENCE};
use blit_readback::verify::{verify_large_read, verify_small_read};

/// 32x32 surface (4 KiB) read back in four 1 KiB chunks.
fn small_geometry() -> Geometry {
    Geometry {
        width: 32,
        height: 32,
        page_size: 1024,
    }
}

fn setup(device: SimDevice, geometry: &Geometry) -> (Session, Sources) {
    let mut session = Session::new(Box::new(device.without_signal_watch()));
    let sources = Sources::create(&mut session, geometry, geometry.default_starts()).unwrap();
    (session, sources)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Call {
    Copy { dst: u32, src: u32 },
    Read { handle: u32, offset: usize, len: usize },
    SetCache { handle: u32, mode: CacheMode },
}

/// Device that records every copy, read and cache-mode call.
struct RecordingDevice {
    inner: SimDevice,
    log: Rc<RefCell<Vec<Call>>>,
}

impl GemDevice for RecordingDevice {
    fn name(&self) -> &str {
        "recording"
    }

    fn alloc(
        &mut self,
        label: &str,
        size: usize,
        alignment: usize,
    ) -> Result<BufferHandle, DeviceError> {
        self.inner.alloc(label, size, alignment)
    }

    fn release(&mut self, handle: BufferHandle) -> Result<(), DeviceError> {
        self.inner.release(handle)
    }

    fn with_write_mapping(
        &mut self,
        handle: BufferHandle,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), DeviceError> {
        self.inner.with_write_mapping(handle, write)
    }

    fn read_range(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError> {
        self.log.borrow_mut().push(Call::Read {
            handle: handle.0,
            offset,
            len: out.len(),
        });
        self.inner.read_range(handle, offset, out)
    }

    fn set_cache_mode(
        &mut self,
        handle: BufferHandle,
        mode: CacheMode,
    ) -> Result<CachingStatus, DeviceError> {
        self.log.borrow_mut().push(Call::SetCache {
            handle: handle.0,
            mode,
        });
        self.inner.set_cache_mode(handle, mode)
    }

    fn copy(
        &mut self,
        dst: BufferHandle,
        src: BufferHandle,
        width: u32,
        height: u32,
    ) -> Result<(), DeviceError> {
        self.log.borrow_mut().push(Call::Copy {
            dst: dst.0,
            src: src.0,
        });
        self.inner.copy(dst, src, width, height)
    }
}

fn large(handle: u32) -> Vec<Call> {
    vec![Call::Read {
        handle,
        offset: 0,
        len: 4096,
    }]
}

fn small(handle: u32) -> Vec<Call> {
    (0..4)
        .map(|i| Call::Read {
            handle,
            offset: i * 1024,
            len: 1024,
        })
        .collect()
}

fn copy(dst: u32, src: u32) -> Vec<Call> {
    vec![Call::Copy { dst, src }]
}

/// Tests that one iteration issues exactly the expected device calls.
#[test]
fn test_sequence_device_calls() {
    let geometry = small_geometry();
    let log = Rc::new(RefCell::new(Vec::new()));
    let device = RecordingDevice {
        inner: SimDevice::new().without_signal_watch(),
        log: log.clone(),
    };
    let mut session = Session::new(Box::new(device));
    let sources = Sources::create(&mut session, &geometry, geometry.default_starts()).unwrap();
    log.borrow_mut().clear();

    // Sources are handles 1 and 2, destinations 3 and 4.
    let (s0, s1, t0, t1) = (1, 2, 3, 4);
    let expected: Vec<Call> = [
        copy(t0, s0),
        large(t0),
        copy(t0, s1),
        large(t0),
        copy(t0, s0),
        small(t0),
        copy(t0, s1),
        small(t0),
        copy(t0, s0),
        large(t0),
        copy(t0, s0),
        copy(t1, s1),
        large(t0),
        large(t1),
        copy(t0, s0),
        copy(t1, s1),
        large(t1),
        large(t0),
        copy(t1, s0),
        copy(t0, s1),
        large(t0),
        large(t1),
    ]
    .concat();

    let scenario = Scenario::new("normal", None, 1);
    let outcome = scenario.run(&mut session, &sources, &geometry).unwrap();

    assert_eq!(outcome, Outcome::Completed { iterations: 1 });
    assert_eq!(*log.borrow(), expected);
}

/// Tests that every iteration repeats the identical sequence.
#[test]
fn test_iterations_are_identical() {
    let geometry = small_geometry();
    let log = Rc::new(RefCell::new(Vec::new()));
    let device = RecordingDevice {
        inner: SimDevice::new().without_signal_watch(),
        log: log.clone(),
    };
    let mut session = Session::new(Box::new(device));
    let sources = Sources::create(&mut session, &geometry, geometry.default_starts()).unwrap();
    log.borrow_mut().clear();

    let scenario = Scenario::new("normal-snoop", Some(CacheMode::Snooped), 3);
    scenario.run(&mut session, &sources, &geometry).unwrap();

    let calls = log.borrow();
    assert_eq!(
        &calls[..2],
        &[
            Call::SetCache {
                handle: 3,
                mode: CacheMode::Snooped
            },
            Call::SetCache {
                handle: 4,
                mode: CacheMode::Snooped
            },
        ]
    );
    let body = &calls[2..];
    assert_eq!(body.len() % 3, 0);
    let per_iteration = body.len() / 3;
    assert_eq!(&body[..per_iteration], &body[per_iteration..2 * per_iteration]);
    assert_eq!(&body[..per_iteration], &body[2 * per_iteration..]);
    assert_eq!(session.stats().iterations, 3);
}

/// Tests the reference run: after copy(tmp0, src0), word i of tmp0 is i.
#[test]
fn test_reference_copy_content() {
    let geometry = Geometry::default();
    let (mut session, sources) = setup(SimDevice::new(), &geometry);
    assert_eq!(sources.start(), [0, 262_144]);

    let tmp0 = session.alloc("dst bo", geometry.size(), 4096).unwrap();
    session
        .copy(&tmp0, &sources.buffers()[0], geometry.width, geometry.height)
        .unwrap();

    let mut bytes = vec![0u8; geometry.size()];
    session.read_range(&tmp0, 0, &mut bytes).unwrap();
    assert_eq!(bytes.len() / 4, 262_144);
    for (i, w) in bytes.chunks_exact(4).enumerate() {
        assert_eq!(u32::from_ne_bytes([w[0], w[1], w[2], w[3]]), i as u32);
    }
}

/// Tests the full-overwrite guarantee: a second copy leaves no trace of the first.
#[test]
fn test_second_copy_fully_overwrites() {
    let geometry = small_geometry();
    let (mut session, sources) = setup(SimDevice::new(), &geometry);
    let [start0, start1] = sources.start();
    let [src0, src1] = sources.buffers();

    let dst = session.alloc("dst bo", geometry.size(), 4096).unwrap();
    session.copy(&dst, src0, geometry.width, geometry.height).unwrap();
    session.copy(&dst, src1, geometry.width, geometry.height).unwrap();

    verify_large_read(&mut session, &dst, start1).unwrap();
    verify_small_read(&mut session, &dst, start1, geometry.page_size).unwrap();
    assert!(verify_large_read(&mut session, &dst, start0).is_err());
}

/// Tests that paired copies verify in either order.
#[test]
fn test_paired_copies_verify_in_any_order() {
    let geometry = small_geometry();
    let (mut session, sources) = setup(SimDevice::new(), &geometry);
    let [start0, start1] = sources.start();
    let [src0, src1] = sources.buffers();
    let dst0 = session.alloc("dst bo", geometry.size(), 4096).unwrap();
    let dst1 = session.alloc("dst bo", geometry.size(), 4096).unwrap();

    session.copy(&dst0, src0, geometry.width, geometry.height).unwrap();
    session.copy(&dst1, src1, geometry.width, geometry.height).unwrap();
    verify_large_read(&mut session, &dst1, start1).unwrap();
    verify_large_read(&mut session, &dst0, start0).unwrap();

    session.copy(&dst0, src0, geometry.width, geometry.height).unwrap();
    session.copy(&dst1, src1, geometry.width, geometry.height).unwrap();
    verify_large_read(&mut session, &dst0, start0).unwrap();
    verify_large_read(&mut session, &dst1, start1).unwrap();
}

/// Tests that every cache mode passes on a well-behaved device.
#[test]
fn test_all_cache_modes_complete() {
    let geometry = small_geometry();
    let (mut session, sources) = setup(SimDevice::new(), &geometry);
    let modes = [
        None,
        Some(CacheMode::Uncached),
        Some(CacheMode::Snooped),
        Some(CacheMode::Display),
    ];
    for mode in modes {
        let scenario = Scenario::new("mode", mode, 2);
        let outcome = scenario.run(&mut session, &sources, &geometry).unwrap();
        assert_eq!(outcome, Outcome::Completed { iterations: 2 });
    }
    assert_eq!(session.outstanding_buffers(), 2);
    assert_eq!(session.stats().iterations, 8);
}

/// Tests that an unsupported cache mode skips without running any step.
#[test]
fn test_unsupported_cache_mode_skips() {
    let geometry = small_geometry();
    let device = SimDevice::new().with_supported_modes(vec![CacheMode::Uncached]);
    let (mut session, sources) = setup(device, &geometry);
    let copies_before = session.stats().copies;

    let scenario = Scenario::new("normal-display", Some(CacheMode::Display), 1);
    let outcome = scenario.run(&mut session, &sources, &geometry).unwrap();

    assert!(matches!(outcome, Outcome::Skipped { .. }));
    assert_eq!(session.stats().copies, copies_before);
    assert_eq!(session.outstanding_buffers(), 2);
}

/// Tests that a repeat count of zero still runs the sequence once.
#[test]
fn test_zero_repeat_runs_once() {
    let geometry = small_geometry();
    let (mut session, sources) = setup(SimDevice::new(), &geometry);
    let outcome = Scenario::new("normal", None, 0)
        .run(&mut session, &sources, &geometry)
        .unwrap();
    assert_eq!(outcome, Outcome::Completed { iterations: 1 });
}

/// Tests that a missing whole-buffer flush is caught by the first large read.
#[test]
fn test_skipped_full_flush_is_caught() {
    let geometry = small_geometry();
    let device = SimDevice::new().with_fault(SimFault::SkipFullFlush);
    let (mut session, sources) = setup(device, &geometry);

    let err = Scenario::new("normal", None, 1)
        .run(&mut session, &sources, &geometry)
        .unwrap_err();
    let mismatch = err.mismatch().unwrap();

    assert_eq!(mismatch.strategy, ReadStrategy::Large);
    // Word 0 of the stale zero-filled buffer happens to match start 0.
    assert_eq!(mismatch.offset, 4);
    assert_eq!(mismatch.expected, 1);
    assert_eq!(mismatch.actual, 0);
    assert_eq!(session.stats().copies, 1);
    assert_eq!(session.outstanding_buffers(), 2);
}

/// Tests that a missing ranged flush is only caught by the small read.
#[test]
fn test_skipped_ranged_flush_is_caught() {
    let geometry = small_geometry();
    let device = SimDevice::new().with_fault(SimFault::SkipRangedFlush);
    let (mut session, sources) = setup(device, &geometry);
    let [_, start1] = sources.start();

    let err = Scenario::new("normal", None, 1)
        .run(&mut session, &sources, &geometry)
        .unwrap_err();
    let mismatch = err.mismatch().unwrap();

    assert_eq!(mismatch.strategy, ReadStrategy::Small);
    assert_eq!(mismatch.offset, 0);
    assert_eq!(mismatch.expected, 0);
    assert_eq!(mismatch.actual, start1);
    assert_eq!(session.stats().large_reads, 2);
}

/// Tests that a partial blit leaves residual words that are caught.
#[test]
fn test_partial_copy_is_caught() {
    let geometry = small_geometry();
    let device = SimDevice::new().with_fault(SimFault::PartialCopy);
    let (mut session, sources) = setup(device, &geometry);

    let err = Scenario::new("normal", None, 1)
        .run(&mut session, &sources, &geometry)
        .unwrap_err();
    let mismatch = err.mismatch().unwrap();

    assert_eq!(mismatch.offset, geometry.size() / 2);
    assert_eq!(mismatch.expected, (geometry.size() / 8) as u32);
    assert_eq!(mismatch.actual, 0);
}

/// Tests that snooped destinations do not depend on the flush path.
#[test]
fn test_snooped_mode_hides_flush_bug() {
    let geometry = small_geometry();
    let device = SimDevice::new().with_fault(SimFault::SkipFullFlush);
    let (mut session, sources) = setup(device, &geometry);

    let outcome = Scenario::new("normal-snoop", Some(CacheMode::Snooped), 2)
        .run(&mut session, &sources, &geometry)
        .unwrap();
    assert_eq!(outcome, Outcome::Completed { iterations: 2 });
}

/// Tests that interrupting every blocking call does not change the outcome.
#[test]
fn test_interruptions_are_transparent() {
    let geometry = small_geometry();
    let scenario = Scenario::new("interruptible", None, 5);

    let (mut quiet, quiet_sources) = setup(SimDevice::new(), &geometry);
    let expected = scenario.run(&mut quiet, &quiet_sources, &geometry).unwrap();

    let (mut noisy, noisy_sources) = setup(SimDevice::new().with_interrupt_every(1), &geometry);
    let outcome = scenario.run(&mut noisy, &noisy_sources, &geometry).unwrap();

    assert_eq!(outcome, expected);
    let (q, n) = (quiet.stats(), noisy.stats());
    assert_eq!(n.copies, q.copies);
    assert_eq!(n.chunk_reads, q.chunk_reads);
    assert_eq!(q.interrupted_retries, 0);
    // Two source mappings plus every copy and every chunk read.
    assert_eq!(n.interrupted_retries, 2 + n.copies + n.chunk_reads);
}

/// Tests transparency with a sparser interruption schedule and a cache mode.
#[test]
fn test_sparse_interruptions_are_transparent() {
    let geometry = small_geometry();
    let (mut session, sources) = setup(SimDevice::new().with_interrupt_every(3), &geometry);

    let outcome = Scenario::new("interruptible-uncached", Some(CacheMode::Uncached), 10)
        .run(&mut session, &sources, &geometry)
        .unwrap();

    assert_eq!(outcome, Outcome::Completed { iterations: 10 });
    assert!(session.stats().interrupted_retries > 0);
}

/// Tests that a copy larger than the destination is a device error.
#[test]
fn test_copy_geometry_mismatch_is_device_error() {
    let geometry = small_geometry();
    let (mut session, sources) = setup(SimDevice::new(), &geometry);
    let bigger = Geometry {
        width: 64,
        ..geometry
    };

    let err = Scenario::new("normal", None, 1)
        .run(&mut session, &sources, &bigger)
        .unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::Device(DeviceError::CopyGeometry { .. })
    ));
    assert_eq!(session.outstanding_buffers(), 2);
}

/// Tests the shape of the step table.
#[test]
fn test_sequence_table() {
    assert_eq!(SEQUENCE.len(), 8);
    let last = &SEQUENCE[7];
    assert_eq!((last.blits[0].dst, last.blits[0].src), (1, 0));
    assert_eq!((last.blits[1].dst, last.blits[1].src), (0, 1));
    assert_eq!((last.checks[0].dst, last.checks[0].src), (0, 1));
    assert_eq!((last.checks[1].dst, last.checks[1].src), (1, 0));
}
