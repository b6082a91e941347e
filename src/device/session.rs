//! Device Session.
//!
//! The `Session` is the context object every operation receives. It owns the
//! device backend for the duration of a run, reissues interrupted calls and
//! accumulates the run statistics.

use super::traits::GemDevice;
use crate::common::{Buffer, CacheMode, CachingStatus, DeviceError};
use crate::stats::RunStats;
use tracing::{debug, trace};

/// Open device plus the state scoped to one run.
pub struct Session {
    device: Box<dyn GemDevice>,
    stats: RunStats,
    outstanding: usize,
}

/// Reissues `call` until it returns something other than an interruption.
///
/// Each retry is counted in `retries`.
fn retry_interrupted<T>(
    retries: &mut u64,
    mut call: impl FnMut() -> Result<T, DeviceError>,
) -> Result<T, DeviceError> {
    loop {
        match call() {
            Err(e) if e.is_interrupted() => {
                *retries += 1;
                trace!("retrying interrupted call");
            }
            result => return result,
        }
    }
}

impl Session {
    /// Creates a session around an opened device.
    pub fn new(device: Box<dyn GemDevice>) -> Self {
        debug!(backend = device.name(), "session opened");
        Self {
            device,
            stats: RunStats::default(),
            outstanding: 0,
        }
    }

    /// Returns the backend name.
    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    /// Number of buffers allocated through this session and not yet released.
    pub fn outstanding_buffers(&self) -> usize {
        self.outstanding
    }

    /// Allocates a buffer.
    pub fn alloc(
        &mut self,
        label: &str,
        size: usize,
        alignment: usize,
    ) -> Result<Buffer, DeviceError> {
        let device = &mut self.device;
        let handle = retry_interrupted(&mut self.stats.interrupted_retries, || {
            device.alloc(label, size, alignment)
        })?;
        self.outstanding += 1;
        trace!(%handle, label, size, "allocated");
        Ok(Buffer::new(handle, size, label))
    }

    /// Releases a buffer, consuming it.
    pub fn release(&mut self, buffer: Buffer) -> Result<(), DeviceError> {
        let handle = buffer.handle();
        let device = &mut self.device;
        retry_interrupted(&mut self.stats.interrupted_retries, || device.release(handle))?;
        self.outstanding = self.outstanding.saturating_sub(1);
        trace!(%handle, "released");
        Ok(())
    }

    /// Runs `write` over a scoped CPU write mapping of the whole buffer.
    pub fn with_write_mapping(
        &mut self,
        buffer: &Buffer,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), DeviceError> {
        let handle = buffer.handle();
        let device = &mut self.device;
        retry_interrupted(&mut self.stats.interrupted_retries, || {
            device.with_write_mapping(handle, &mut *write)
        })?;
        self.stats.bytes_written += buffer.size() as u64;
        Ok(())
    }

    /// Reads `out.len()` bytes at `offset` into `out`.
    pub fn read_range(
        &mut self,
        buffer: &Buffer,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError> {
        let handle = buffer.handle();
        let device = &mut self.device;
        retry_interrupted(&mut self.stats.interrupted_retries, || {
            device.read_range(handle, offset, out)
        })?;
        self.stats.chunk_reads += 1;
        self.stats.bytes_read += out.len() as u64;
        Ok(())
    }

    /// Applies a cache mode to a buffer.
    pub fn set_cache_mode(
        &mut self,
        buffer: &Buffer,
        mode: CacheMode,
    ) -> Result<CachingStatus, DeviceError> {
        let handle = buffer.handle();
        let device = &mut self.device;
        let status = retry_interrupted(&mut self.stats.interrupted_retries, || {
            device.set_cache_mode(handle, mode)
        })?;
        debug!(%handle, %mode, ?status, "set cache mode");
        Ok(status)
    }

    /// Blits `src` into `dst` as a `width` x `height` 32-bit surface.
    pub fn copy(
        &mut self,
        dst: &Buffer,
        src: &Buffer,
        width: u32,
        height: u32,
    ) -> Result<(), DeviceError> {
        let (dst_handle, src_handle) = (dst.handle(), src.handle());
        let device = &mut self.device;
        retry_interrupted(&mut self.stats.interrupted_retries, || {
            device.copy(dst_handle, src_handle, width, height)
        })?;
        self.stats.copies += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_counts_interruptions_and_returns_result() {
        let mut retries = 0;
        let mut calls = 0;
        let value = retry_interrupted(&mut retries, || {
            calls += 1;
            if calls < 4 {
                Err(DeviceError::Interrupted)
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(value, 4);
        assert_eq!(retries, 3);
    }

    #[test]
    fn retry_passes_genuine_failures_through() {
        let mut retries = 0;
        let result: Result<(), _> =
            retry_interrupted(&mut retries, || Err(DeviceError::NoDevice("gone".into())));
        assert!(matches!(result, Err(DeviceError::NoDevice(_))));
        assert_eq!(retries, 0);
    }
}
