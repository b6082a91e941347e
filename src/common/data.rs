//! Buffer and Coherency Types.
//!
//! This module defines the vocabulary shared by the device layer, the
//! verifier and the scenario driver: buffer handles, cache modes and the
//! two readback strategies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a buffer object owned by a device backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A buffer allocated through a [`Session`](crate::device::Session).
///
/// The buffer is not `Clone`; releasing it consumes the value so a released
/// handle cannot be used again.
#[derive(Debug, PartialEq, Eq)]
pub struct Buffer {
    handle: BufferHandle,
    size: usize,
    label: String,
}

impl Buffer {
    pub(crate) fn new(handle: BufferHandle, size: usize, label: &str) -> Self {
        Self {
            handle,
            size,
            label: label.to_string(),
        }
    }

    /// Returns the backend handle.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Returns the size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of 32-bit words the buffer holds.
    pub fn words(&self) -> usize {
        self.size / super::constants::WORD_SIZE
    }

    /// Returns the allocation label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Cache coherency mode applied to a destination buffer.
///
/// The numeric levels follow the kernel caching ioctl: 0 is uncached,
/// 1 is LLC snooped and 2 is the display (write-through) mode. The system
/// default has no variant; callers use `Option<CacheMode>` and `None`
/// skips the configuration step entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    Uncached,
    Snooped,
    Display,
}

impl CacheMode {
    /// All explicit cache modes, in subtest order.
    pub const ALL: [CacheMode; 3] = [CacheMode::Uncached, CacheMode::Snooped, CacheMode::Display];

    /// Returns the caching level passed to the kernel.
    pub fn level(self) -> u32 {
        match self {
            CacheMode::Uncached => 0,
            CacheMode::Snooped => 1,
            CacheMode::Display => 2,
        }
    }

    /// Returns the suffix used in subtest names (`normal-snoop`, ...).
    pub fn subtest_suffix(self) -> &'static str {
        match self {
            CacheMode::Uncached => "uncached",
            CacheMode::Snooped => "snoop",
            CacheMode::Display => "display",
        }
    }

    /// Returns true if CPU reads observe GPU writes without an explicit flush.
    pub fn is_coherent(self) -> bool {
        matches!(self, CacheMode::Snooped)
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheMode::Uncached => "uncached",
            CacheMode::Snooped => "snooped",
            CacheMode::Display => "display",
        };
        f.write_str(name)
    }
}

/// Result of asking a backend to apply a cache mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachingStatus {
    /// The mode is now in effect for the buffer.
    Applied,
    /// The backend does not support the mode; the buffer is unchanged.
    Unsupported,
}

/// Granularity used to read a buffer back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStrategy {
    /// One read covering the whole buffer (whole-buffer flush path).
    Large,
    /// One read per page-sized chunk (ranged flush path).
    Small,
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStrategy::Large => f.write_str("large"),
            ReadStrategy::Small => f.write_str("small"),
        }
    }
}
