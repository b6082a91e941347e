//! Test module organization.
//!
//! This module organizes all integration tests for the blit readback checker.




/// Scenario sequence, coherency property and fault detection tests.
mod scenario_tests;
