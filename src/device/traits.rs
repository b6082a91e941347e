//! Device Backend Traits.
//!
//! This module defines the narrow interface through which the checker talks
//! to the buffer manager and the copy engine. Everything behind it (command
//! submission, cache domain tracking, allocation policy) is the system under
//! test; the checker only observes what a CPU read returns.

use crate::common::{BufferHandle, CacheMode, CachingStatus, DeviceError};

/// Buffer manager and blitter of a GPU device.
///
/// Blocking calls (`copy`, `read_range`, `with_write_mapping`,
/// `set_cache_mode`) may return [`DeviceError::Interrupted`] when a signal
/// arrives while they wait. Callers must reissue the same call; the
/// [`Session`](super::Session) does this transparently.
pub trait GemDevice {
    /// Returns a short name of the backend for diagnostics.
    fn name(&self) -> &str;

    /// Allocates a buffer object.
    ///
    /// # Arguments
    ///
    /// * `label` - Debug name of the allocation
    /// * `size` - Size in bytes
    /// * `alignment` - Required alignment in bytes
    fn alloc(&mut self, label: &str, size: usize, alignment: usize)
        -> Result<BufferHandle, DeviceError>;

    /// Drops the backend's reference to a buffer.
    fn release(&mut self, handle: BufferHandle) -> Result<(), DeviceError>;

    /// Maps the buffer for CPU writes, runs `write` over the whole mapping
    /// and unmaps it again before returning.
    fn with_write_mapping(
        &mut self,
        handle: BufferHandle,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), DeviceError>;

    /// Copies `out.len()` bytes starting at `offset` into `out`.
    fn read_range(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), DeviceError>;

    /// Applies a cache coherency mode to a buffer.
    ///
    /// # Returns
    ///
    /// `CachingStatus::Unsupported` if the device cannot provide the mode.
    fn set_cache_mode(
        &mut self,
        handle: BufferHandle,
        mode: CacheMode,
    ) -> Result<CachingStatus, DeviceError>;

    /// Blits a `width` x `height` surface of 32-bit pixels from `src` to `dst`.
    fn copy(
        &mut self,
        dst: BufferHandle,
        src: BufferHandle,
        width: u32,
        height: u32,
    ) -> Result<(), DeviceError>;
}
