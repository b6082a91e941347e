//! Blit Readback Coherency Checker.
//!
//! This crate checks that a GPU blit into a buffer is fully visible to a
//! following CPU read of that buffer. Two sources are filled with a
//! sequential word pattern, blitted into scratch buffers in a fixed order,
//! and read back either in one request or page by page. Any word that does
//! not match the pattern is a coherency failure.
//!
//! # Architecture
//!
//! * **Pattern**: deterministic sequential-word content of the sources.
//! * **Verifier**: large (whole-buffer) and small (page-sized) readback.
//! * **Scenario**: the fixed blit/verify sequence, repeated per subtest.
//! * **Selector**: named subtests (cache mode × interruptible).
//! * **Device**: backend trait, session context and a simulated GPU.
//!
//! # Modules
//!
//! * `common`: Shared types, constants, and error handling.
//! * `config`: Configuration loading and validation.
//! * `device`: Backend trait, session and simulated device.
//! * `harness`: Subtest filtering, environment checks, signal helper.
//! * `pattern`: Pattern generation.
//! * `scenario`: Scenario driver.
//! * `selector`: Subtest enumeration and execution.
//! * `stats`: Run statistics.
//! * `verify`: Readback verification.

/// Shared types, constants and error handling.
pub mod common;

/// Configuration system for scenario geometry, device backend and stress timing.
///
/// Loads TOML configuration files; every field has a default so the
/// reference scenario needs no file at all.
pub mod config;

/// Device backend trait, the session context object and the simulated GPU.
pub mod device;

/// Harness plumbing: subtest selection, simulation check, signal helper.
pub mod harness;

/// Sequential word pattern used as ground truth.
pub mod pattern;

/// Fixed blit/verify sequence and the scenario runner.
pub mod scenario;

/// Named subtests and their execution.
pub mod selector;

/// Run statistics collection and reporting.
pub mod stats;

/// Whole-buffer and page-sized readback verification.
pub mod verify;
