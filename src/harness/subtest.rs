//! Subtest selection by name.

use std::fmt;

/// Which named subtests a run executes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubtestFilter {
    only: Option<String>,
}

/// The requested subtest does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown subtest '{name}' (known: {known})")]
pub struct UnknownSubtest {
    pub name: String,
    pub known: String,
}

impl SubtestFilter {
    /// Runs every subtest.
    pub fn all() -> Self {
        Self { only: None }
    }

    /// Runs only the subtest called `name`.
    pub fn only(name: impl Into<String>) -> Self {
        Self {
            only: Some(name.into()),
        }
    }

    /// Builds a filter from an optional `--run-subtest` argument.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(name) => Self::only(name),
            None => Self::all(),
        }
    }

    /// Returns true if the subtest `name` is selected.
    pub fn should_run(&self, name: &str) -> bool {
        self.only.as_deref().map_or(true, |only| only == name)
    }

    /// Checks that the requested subtest is one of `known`.
    pub fn check<S: AsRef<str>>(&self, known: &[S]) -> Result<(), UnknownSubtest> {
        match &self.only {
            Some(name) if !known.iter().any(|k| k.as_ref() == name) => Err(UnknownSubtest {
                name: name.clone(),
                known: known
                    .iter()
                    .map(|k| k.as_ref())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SubtestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.only {
            Some(name) => write!(f, "{}", name),
            None => f.write_str("all"),
        }
    }
}
