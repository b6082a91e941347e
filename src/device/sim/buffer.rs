//! Simulated Buffer Object.
//!
//! A buffer object keeps two views of its content: the backing memory the
//! CPU reads, and a render cache holding blitter writes that have not been
//! flushed yet. A CPU read only observes a blit once the render cache has
//! been flushed into memory, unless the buffer is snooped.

use crate::common::CacheMode;

/// Simulated GEM buffer object.
pub struct SimBuffer {
    /// Content visible to CPU reads.
    memory: Vec<u8>,
    /// Pending GPU writes covering the whole buffer.
    render_cache: Option<Vec<u8>>,
    pub cache_mode: Option<CacheMode>,
}

impl SimBuffer {
    /// Creates a zero-filled buffer.
    pub fn new(size: usize) -> Self {
        Self {
            memory: vec![0; size],
            render_cache: None,
            cache_mode: None,
        }
    }

    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if GPU writes are waiting in the render cache.
    pub fn is_dirty(&self) -> bool {
        self.render_cache.is_some()
    }

    /// Moves pending GPU writes into memory.
    pub fn flush(&mut self) {
        if let Some(pending) = self.render_cache.take() {
            self.memory = pending;
        }
    }

    /// Content as seen by the GPU: pending writes win over memory.
    pub fn gpu_view(&self) -> &[u8] {
        self.render_cache.as_deref().unwrap_or(&self.memory)
    }

    /// Content as seen by the CPU without any flush.
    ///
    /// Snooped buffers see the render cache directly.
    pub fn cpu_view(&self) -> &[u8] {
        if self.cache_mode.is_some_and(CacheMode::is_coherent) {
            self.gpu_view()
        } else {
            &self.memory
        }
    }

    /// Memory for a CPU write mapping. The caller flushes first.
    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// Writes `len` bytes of `data` into the render cache at offset 0.
    pub fn gpu_write(&mut self, data: &[u8], len: usize) {
        let mut pending = match self.render_cache.take() {
            Some(pending) => pending,
            None => self.memory.clone(),
        };
        pending[..len].copy_from_slice(&data[..len]);
        self.render_cache = Some(pending);
    }
}
