//! Test harness plumbing: subtest selection, environment checks and the
//! signal interruption helper.

/// Environment checks (skip on simulation).
pub mod env;

/// Signal-based interruption injection.
pub mod stress;

/// Subtest selection by name.
pub mod subtest;

pub use stress::{Interrupter, NoInterrupter, SignalHelper};
pub use subtest::{SubtestFilter, UnknownSubtest};
