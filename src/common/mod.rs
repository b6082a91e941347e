//! Common types used throughout the checker.
//!
//! This module provides the buffer vocabulary, reference constants and
//! error types shared by the device layer, the verifier and the scenario
//! driver.

/// Reference scenario constants.
pub mod constants;

/// Buffer handles, cache modes and read strategies.
pub mod data;

/// Error types.
pub mod error;

pub use data::{Buffer, BufferHandle, CacheMode, CachingStatus, ReadStrategy};
pub use error::{DeviceError, Mismatch, ScenarioError};
