//! Scenario Selector.
//!
//! Subtests are the cross product of the cache configuration (system
//! default, uncached, snooped, display) and whether the run is interrupted
//! by signals. Interruptible variants repeat the sequence many times with
//! the signal helper running.

use crate::common::{CacheMode, DeviceError, ScenarioError};
use crate::device::Session;
use crate::harness::{Interrupter, SubtestFilter};
use crate::scenario::{Geometry, Outcome, Scenario, Sources};
use tracing::info;

/// One named subtest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Variant {
    pub cache_mode: Option<CacheMode>,
    pub interruptible: bool,
}

impl Variant {
    /// Every variant, in execution order.
    pub fn all() -> Vec<Variant> {
        let modes = std::iter::once(None).chain(CacheMode::ALL.into_iter().map(Some));
        modes
            .flat_map(|cache_mode| {
                [false, true].into_iter().map(move |interruptible| Variant {
                    cache_mode,
                    interruptible,
                })
            })
            .collect()
    }

    /// Names of every variant, in execution order.
    pub fn names() -> Vec<String> {
        Self::all().iter().map(Variant::name).collect()
    }

    /// Subtest name, e.g. `normal`, `interruptible-snoop`.
    pub fn name(&self) -> String {
        let prefix = if self.interruptible {
            "interruptible"
        } else {
            "normal"
        };
        match self.cache_mode {
            None => prefix.to_string(),
            Some(mode) => format!("{}-{}", prefix, mode.subtest_suffix()),
        }
    }

    /// Repeat count: 1, or `stress_loops` for interruptible variants.
    pub fn repeat(&self, stress_loops: u32) -> u32 {
        if self.interruptible {
            stress_loops
        } else {
            1
        }
    }

    pub fn scenario(&self, stress_loops: u32) -> Scenario {
        Scenario::new(self.name(), self.cache_mode, self.repeat(stress_loops))
    }
}

/// Parameters shared by every selected subtest.
#[derive(Clone, Debug)]
pub struct RunPlan {
    pub filter: SubtestFilter,
    pub geometry: Geometry,
    pub stress_loops: u32,
}

/// Result of a subtest that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtestResult {
    pub name: String,
    pub outcome: Outcome,
}

/// Runs every variant selected by `plan.filter`.
///
/// Interruptible variants run between `interrupter.start()` and
/// `interrupter.stop()`; the interrupter is stopped before any failure is
/// returned. The first failure ends the run.
pub fn run_selected(
    session: &mut Session,
    sources: &Sources,
    plan: &RunPlan,
    interrupter: &mut dyn Interrupter,
) -> Result<Vec<SubtestResult>, ScenarioError> {
    let mut results = Vec::new();
    for variant in Variant::all() {
        let name = variant.name();
        if !plan.filter.should_run(&name) {
            continue;
        }
        let scenario = variant.scenario(plan.stress_loops);
        println!("[Subtest] {}", name);
        info!(subtest = %name, repeat = scenario.repeat, cache_mode = ?scenario.cache_mode, "starting");

        if variant.interruptible {
            interrupter.start().map_err(DeviceError::from)?;
        }
        let result = scenario.run(session, sources, &plan.geometry);
        let stopped = if variant.interruptible {
            interrupter.stop()
        } else {
            Ok(())
        };

        let outcome = result?;
        stopped.map_err(DeviceError::from)?;
        match &outcome {
            Outcome::Completed { iterations } => {
                session.stats_mut().scenarios_completed += 1;
                println!("[Subtest] {}: SUCCESS ({} iterations)", name, iterations);
            }
            Outcome::Skipped { reason } => {
                session.stats_mut().scenarios_skipped += 1;
                println!("[Subtest] {}: SKIP ({})", name, reason);
            }
        }
        results.push(SubtestResult { name, outcome });
    }
    Ok(results)
}
