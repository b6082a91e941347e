//! Error types.
//!
//! There are exactly two failure classes: the environment is unusable
//! (`DeviceError`) or the buffer content is wrong (`Mismatch`). An
//! interrupted blocking call is reported as `DeviceError::Interrupted` and
//! never escapes the [`Session`](crate::device::Session) retry loop.

use super::data::{BufferHandle, ReadStrategy};
use std::io;

/// Failure reported by a device backend or the harness around it.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// A blocking call was interrupted by a signal and must be reissued.
    #[error("interrupted system call")]
    Interrupted,

    #[error("no usable device: {0}")]
    NoDevice(String),

    #[error("failed to allocate {size} bytes for '{label}'")]
    Alloc { label: String, size: usize },

    #[error("failed to map buffer {0} for writing")]
    Map(BufferHandle),

    #[error("unknown buffer handle {0}")]
    InvalidHandle(BufferHandle),

    #[error("range {offset:#x}+{len:#x} exceeds buffer {handle} of {size:#x} bytes")]
    OutOfRange {
        handle: BufferHandle,
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("{width}x{height} blit does not fit buffer {handle} of {size:#x} bytes")]
    CopyGeometry {
        handle: BufferHandle,
        width: u32,
        height: u32,
        size: usize,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DeviceError {
    /// Returns true for the retryable interruption result.
    pub fn is_interrupted(&self) -> bool {
        match self {
            DeviceError::Interrupted => true,
            DeviceError::Io(e) => e.kind() == io::ErrorKind::Interrupted,
            _ => false,
        }
    }
}

/// First word whose read-back value differs from the expected pattern.
///
/// The message matches the diagnostic printed before the process aborts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Unexpected value {actual:#010x} instead of {expected:#010x} at offset {offset:#010x} ({strategy} read)"
)]
pub struct Mismatch {
    pub strategy: ReadStrategy,
    /// Byte offset from the start of the buffer.
    pub offset: usize,
    pub expected: u32,
    pub actual: u32,
}

/// Failure of a verification or of a scenario run.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Mismatch(#[from] Mismatch),
}

impl ScenarioError {
    /// Returns the mismatch if this failure is a verification failure.
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            ScenarioError::Mismatch(m) => Some(m),
            ScenarioError::Device(_) => None,
        }
    }
}
