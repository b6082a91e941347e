//! Simulated GEM Device.
//!
//! A software model of a GPU buffer manager and blitter. Blits land in a
//! per-buffer render cache; the read path flushes it before copying data
//! out, as the kernel does when it moves a buffer into the CPU read domain.
//!
//! The model can be configured to misbehave so the checker can be shown to
//! catch the bugs it exists for:
//!
//! * **skip-full-flush**: whole-buffer reads skip the flush.
//! * **skip-ranged-flush**: sub-range reads skip the flush.
//! * **partial-copy**: the blitter only copies the first half of the rows.
//!
//! Blocking calls can also be interrupted, either on a fixed schedule or
//! whenever the stress signal handler has recorded a pending signal.

mod buffer;

pub use buffer::SimBuffer;

use super::traits::GemDevice;
use crate::common::constants::BYTES_PER_PIXEL;
use crate::common::{BufferHandle, CacheMode, CachingStatus, DeviceError};
use crate::config::DeviceConfig;
use crate::harness::stress;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Coherency bug injected into the simulated kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimFault {
    #[default]
    None,
    SkipFullFlush,
    SkipRangedFlush,
    PartialCopy,
}

/// Software model of a GPU with a blitter.
pub struct SimDevice {
    buffers: HashMap<BufferHandle, SimBuffer>,
    next_handle: u32,
    supported_modes: Vec<CacheMode>,
    fault: SimFault,
    interrupt_every: u32,
    blocking_calls: u64,
    last_interrupted: bool,
    watch_signals: bool,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDevice {
    /// Creates a well-behaved device supporting every cache mode.
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            next_handle: 1,
            supported_modes: CacheMode::ALL.to_vec(),
            fault: SimFault::None,
            interrupt_every: 0,
            blocking_calls: 0,
            last_interrupted: false,
            watch_signals: true,
        }
    }

    /// Creates a device from the `[device]` configuration section.
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new()
            .with_supported_modes(config.supported_cache_modes.clone())
            .with_fault(config.fault)
            .with_interrupt_every(config.interrupt_every)
    }

    /// Restricts the cache modes `set_cache_mode` accepts.
    pub fn with_supported_modes(mut self, modes: Vec<CacheMode>) -> Self {
        self.supported_modes = modes;
        self
    }

    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.fault = fault;
        self
    }

    /// Interrupts every `n`-th blocking call; 0 disables the schedule.
    ///
    /// A reissued call is never interrupted by the schedule, so `n = 1`
    /// interrupts each call exactly once.
    pub fn with_interrupt_every(mut self, n: u32) -> Self {
        self.interrupt_every = n;
        self
    }

    /// Ignores signals recorded by the stress handler.
    pub fn without_signal_watch(mut self) -> Self {
        self.watch_signals = false;
        self
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&SimBuffer, DeviceError> {
        self.buffers
            .get(&handle)
            .ok_or(DeviceError::InvalidHandle(handle))
    }

    fn buffer_mut(&mut self, handle: BufferHandle) -> Result<&mut SimBuffer, DeviceError> {
        self.buffers
            .get_mut(&handle)
            .ok_or(DeviceError::InvalidHandle(handle))
    }

    /// Entry point of every blocking call; models `EINTR`.
    fn wait_point(&mut self) -> Result<(), DeviceError> {
        if self.last_interrupted {
            self.last_interrupted = false;
            return Ok(());
        }
        self.blocking_calls += 1;
        let scheduled = self.interrupt_every > 0
            && self.blocking_calls % u64::from(self.interrupt_every) == 0;
        let signalled = self.watch_signals && stress::take_pending_interrupt();
        if scheduled || signalled {
            self.last_interrupted = true;
            trace!(call = self.blocking_calls, signalled, "blocking call interrupted");
            return Err(DeviceError::Interrupted);
        }
        Ok(())
    }
}

impl GemDevice for SimDevice {
    fn name(&self) -> &str {
        "sim"
    }

    fn alloc(
        &mut self,
        label: &str,
        size: usize,
        alignment: usize,
    ) -> Result<BufferHandle, DeviceError> {
        if size == 0 || (alignment != 0 && !alignment.is_power_of_two()) {
            return Err(DeviceError::Alloc {
                label: label.to_string(),
                size,
            });
        }
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        self.buffers.insert(handle, SimBuffer::new(size));
        trace!(%handle, label, size, alignment, "buffer object created");
        Ok(handle)
    }

    fn release(&mut self, handle: BufferHandle) -> Result<(), DeviceError> {
        self.buffers
            .remove(&handle)
            .map(|_| ())
            .ok_or(DeviceError::InvalidHandle(handle))
    }

    fn with_write_mapping(
        &mut self,
        handle: BufferHandle,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), DeviceError> {
        self.wait_point()?;
        let bo = self.buffer_mut(handle)?;
        // Moving to the CPU write domain retires pending GPU writes.
        bo.flush();
        write(bo.memory_mut());
        Ok(())
    }

    fn read_range(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError> {
        self.wait_point()?;
        let fault = self.fault;
        let bo = self.buffer_mut(handle)?;
        let size = bo.size();
        let end = offset
            .checked_add(out.len())
            .filter(|&end| end <= size)
            .ok_or(DeviceError::OutOfRange {
                handle,
                offset,
                len: out.len(),
                size,
            })?;

        let whole = offset == 0 && end == size;
        let skip_flush = match fault {
            SimFault::SkipFullFlush => whole,
            SimFault::SkipRangedFlush => !whole,
            SimFault::None | SimFault::PartialCopy => false,
        };
        if !skip_flush {
            bo.flush();
        }
        out.copy_from_slice(&bo.cpu_view()[offset..end]);
        Ok(())
    }

    fn set_cache_mode(
        &mut self,
        handle: BufferHandle,
        mode: CacheMode,
    ) -> Result<CachingStatus, DeviceError> {
        self.wait_point()?;
        if !self.supported_modes.contains(&mode) {
            self.buffer(handle)?;
            return Ok(CachingStatus::Unsupported);
        }
        let bo = self.buffer_mut(handle)?;
        bo.flush();
        bo.cache_mode = Some(mode);
        trace!(%handle, %mode, level = mode.level(), "caching level set");
        Ok(CachingStatus::Applied)
    }

    fn copy(
        &mut self,
        dst: BufferHandle,
        src: BufferHandle,
        width: u32,
        height: u32,
    ) -> Result<(), DeviceError> {
        self.wait_point()?;
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        for handle in [dst, src] {
            let size = self.buffer(handle)?.size();
            if len > size {
                return Err(DeviceError::CopyGeometry {
                    handle,
                    width,
                    height,
                    size,
                });
            }
        }
        let copied = match self.fault {
            SimFault::PartialCopy => (height as usize / 2) * width as usize * BYTES_PER_PIXEL,
            _ => len,
        };
        let data = self.buffer(src)?.gpu_view()[..copied].to_vec();
        self.buffer_mut(dst)?.gpu_write(&data, copied);
        Ok(())
    }
}
