use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The severity of a [`WideEvent`](crate::WideEvent).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Diagnostic detail.
    Debug,
    /// Regular operation.
    #[default]
    Info,
    /// Something undesirable that did not fail the unit of work.
    Warn,
    /// The unit of work failed.
    Error,
}

impl Level {
    /// All levels in ascending severity.
    pub const ALL: [Level; 4] = [Level::Debug, Level::Info, Level::Warn, Level::Error];

    /// Returns the lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned when parsing [`Level`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid level {0:?}, expected one of debug, info, warn, error")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLevelError(s.to_owned()))
    }
}
