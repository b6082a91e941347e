//! Environment checks.

use std::env;

/// Variable set when running on a hardware simulator, where blits are too
/// slow for this test to be useful.
pub const SIMULATION_VAR: &str = "INTEL_SIMULATION";

/// Returns true if `value` enables simulation mode (a non-zero number or `true`).
pub fn simulation_enabled(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(v) => v.parse::<i64>().map_or(false, |n| n != 0),
    }
}

/// Returns true if the process runs on a hardware simulator.
pub fn running_on_simulation() -> bool {
    simulation_enabled(env::var(SIMULATION_VAR).ok().as_deref())
}
