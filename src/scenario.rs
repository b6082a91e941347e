//! Scenario Driver.
//!
//! A scenario blits the two pattern sources into two scratch destinations
//! in a fixed order and reads every result back. The order is the test
//! surface: single copies verified with both read strategies, paired copies
//! verified in order, then in reverse, then with the sources crossed over.
//!
//! Each scenario owns its two destinations for the whole run and releases
//! them on every exit path. Sources are shared read-only between scenarios.

use crate::common::constants::{
    BUFFER_ALIGNMENT, BYTES_PER_PIXEL, DESTINATION_LABEL, PAGE_SIZE, SOURCE_STARTS,
    SURFACE_HEIGHT, SURFACE_WIDTH,
};
use crate::common::{Buffer, CacheMode, CachingStatus, DeviceError, ReadStrategy, ScenarioError};
use crate::config::ScenarioConfig;
use crate::device::Session;
use crate::pattern;
use crate::verify;
use tracing::{debug, warn};

const TMP0: usize = 0;
const TMP1: usize = 1;
const SRC0: usize = 0;
const SRC1: usize = 1;

/// Blit of source `src` into destination `dst`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Blit {
    pub dst: usize,
    pub src: usize,
}

/// Readback of destination `dst`, expected to hold source `src`'s pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Check {
    pub dst: usize,
    pub src: usize,
    pub strategy: ReadStrategy,
}

/// One step: every blit is issued, then every check runs, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub blits: &'static [Blit],
    pub checks: &'static [Check],
}

/// The sequence executed by every iteration of every scenario.
pub static SEQUENCE: [Step; 8] = [
    // Full-buffer reads after a single blit.
    Step {
        blits: &[Blit { dst: TMP0, src: SRC0 }],
        checks: &[Check { dst: TMP0, src: SRC0, strategy: ReadStrategy::Large }],
    },
    Step {
        blits: &[Blit { dst: TMP0, src: SRC1 }],
        checks: &[Check { dst: TMP0, src: SRC1, strategy: ReadStrategy::Large }],
    },
    // Page-sized reads after a single blit.
    Step {
        blits: &[Blit { dst: TMP0, src: SRC0 }],
        checks: &[Check { dst: TMP0, src: SRC0, strategy: ReadStrategy::Small }],
    },
    Step {
        blits: &[Blit { dst: TMP0, src: SRC1 }],
        checks: &[Check { dst: TMP0, src: SRC1, strategy: ReadStrategy::Small }],
    },
    Step {
        blits: &[Blit { dst: TMP0, src: SRC0 }],
        checks: &[Check { dst: TMP0, src: SRC0, strategy: ReadStrategy::Large }],
    },
    // Two destinations in flight, read back in blit order.
    Step {
        blits: &[Blit { dst: TMP0, src: SRC0 }, Blit { dst: TMP1, src: SRC1 }],
        checks: &[
            Check { dst: TMP0, src: SRC0, strategy: ReadStrategy::Large },
            Check { dst: TMP1, src: SRC1, strategy: ReadStrategy::Large },
        ],
    },
    // Same blits, read back in reverse order.
    Step {
        blits: &[Blit { dst: TMP0, src: SRC0 }, Blit { dst: TMP1, src: SRC1 }],
        checks: &[
            Check { dst: TMP1, src: SRC1, strategy: ReadStrategy::Large },
            Check { dst: TMP0, src: SRC0, strategy: ReadStrategy::Large },
        ],
    },
    // Sources crossed over.
    Step {
        blits: &[Blit { dst: TMP1, src: SRC0 }, Blit { dst: TMP0, src: SRC1 }],
        checks: &[
            Check { dst: TMP0, src: SRC1, strategy: ReadStrategy::Large },
            Check { dst: TMP1, src: SRC0, strategy: ReadStrategy::Large },
        ],
    },
];

/// Surface shape of every buffer in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    /// Chunk size of the small-read strategy.
    pub page_size: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: SURFACE_WIDTH,
            height: SURFACE_HEIGHT,
            page_size: PAGE_SIZE,
        }
    }
}

impl From<&ScenarioConfig> for Geometry {
    fn from(config: &ScenarioConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            page_size: config.page_size,
        }
    }
}

impl Geometry {
    /// Buffer size in bytes.
    pub fn size(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Pattern seed of the second source: one past the last word of the first.
    pub fn default_starts(&self) -> [u32; 2] {
        [SOURCE_STARTS[0], (self.size() / 4) as u32]
    }
}

/// The two pattern-filled source buffers and their seeds.
pub struct Sources {
    buffers: [Buffer; 2],
    start: [u32; 2],
}

impl Sources {
    /// Allocates and fills both sources.
    pub fn create(
        session: &mut Session,
        geometry: &Geometry,
        start: [u32; 2],
    ) -> Result<Self, DeviceError> {
        let first = pattern::create_source(session, geometry.size(), start[0])?;
        let second = match pattern::create_source(session, geometry.size(), start[1]) {
            Ok(buffer) => buffer,
            Err(e) => {
                let _ = session.release(first);
                return Err(e);
            }
        };
        Ok(Self {
            buffers: [first, second],
            start,
        })
    }

    pub fn buffers(&self) -> &[Buffer; 2] {
        &self.buffers
    }

    pub fn start(&self) -> [u32; 2] {
        self.start
    }

    /// Releases both sources.
    pub fn release(self, session: &mut Session) -> Result<(), DeviceError> {
        let [first, second] = self.buffers;
        let first = session.release(first);
        session.release(second)?;
        first
    }
}

/// How a scenario ended, when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed { iterations: u32 },
    Skipped { reason: String },
}

/// One named run of [`SEQUENCE`] under a cache configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    /// `None` leaves the destinations in the system default mode.
    pub cache_mode: Option<CacheMode>,
    pub repeat: u32,
}

impl Scenario {
    pub fn new(name: impl Into<String>, cache_mode: Option<CacheMode>, repeat: u32) -> Self {
        Self {
            name: name.into(),
            cache_mode,
            repeat,
        }
    }

    /// Allocates the destinations, runs the scenario and releases them.
    ///
    /// A mismatch ends the run at the failing check.
    pub fn run(
        &self,
        session: &mut Session,
        sources: &Sources,
        geometry: &Geometry,
    ) -> Result<Outcome, ScenarioError> {
        let size = geometry.size();
        let tmp0 = session.alloc(DESTINATION_LABEL, size, BUFFER_ALIGNMENT)?;
        let tmp1 = match session.alloc(DESTINATION_LABEL, size, BUFFER_ALIGNMENT) {
            Ok(buffer) => buffer,
            Err(e) => {
                let _ = session.release(tmp0);
                return Err(e.into());
            }
        };
        let tmp = [tmp0, tmp1];

        let result = self.run_with(session, sources, &tmp, geometry);

        let [tmp0, tmp1] = tmp;
        let released = session.release(tmp0).and(session.release(tmp1));
        let outcome = result?;
        released?;
        Ok(outcome)
    }

    /// Runs the scenario against caller-owned destinations.
    pub fn run_with(
        &self,
        session: &mut Session,
        sources: &Sources,
        tmp: &[Buffer; 2],
        geometry: &Geometry,
    ) -> Result<Outcome, ScenarioError> {
        if let Some(mode) = self.cache_mode {
            for buffer in tmp {
                match session.set_cache_mode(buffer, mode) {
                    Ok(CachingStatus::Applied) => {}
                    Ok(CachingStatus::Unsupported) => {
                        return Ok(Outcome::Skipped {
                            reason: format!("cache mode {} unsupported", mode),
                        });
                    }
                    Err(e) => {
                        warn!(scenario = %self.name, %mode, error = %e, "set cache mode failed");
                        return Ok(Outcome::Skipped {
                            reason: format!("cache mode {} failed: {}", mode, e),
                        });
                    }
                }
            }
        }

        let iterations = self.repeat.max(1);
        for iteration in 0..iterations {
            for (index, step) in SEQUENCE.iter().enumerate() {
                debug!(scenario = %self.name, iteration, step = index, "step");
                run_step(session, step, sources, tmp, geometry)?;
            }
            session.stats_mut().iterations += 1;
        }
        Ok(Outcome::Completed { iterations })
    }
}

/// Issues the blits of `step`, then runs its checks in order.
pub fn run_step(
    session: &mut Session,
    step: &Step,
    sources: &Sources,
    tmp: &[Buffer; 2],
    geometry: &Geometry,
) -> Result<(), ScenarioError> {
    for blit in step.blits {
        session.copy(
            &tmp[blit.dst],
            &sources.buffers[blit.src],
            geometry.width,
            geometry.height,
        )?;
    }
    for check in step.checks {
        verify::verify(
            session,
            &tmp[check.dst],
            sources.start[check.src],
            check.strategy,
            geometry.page_size,
        )?;
    }
    Ok(())
}
