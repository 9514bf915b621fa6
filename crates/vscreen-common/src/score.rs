//! Docking score value shared by the extractor, the result store and the ranker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker written in place of a score when none could be obtained.
pub const UNAVAILABLE_MARKER: &str = "N/A";

/// A binding-affinity score in kcal/mol, or the explicit absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Value(f64),
    Unavailable,
}

impl Score {
    /// Wrap a parsed value, rejecting NaN and infinities.
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Score::Value(value)
        } else {
            Score::Unavailable
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(*v),
            Score::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Score::Value(_))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Value(v) => write!(f, "{}", v),
            Score::Unavailable => f.write_str(UNAVAILABLE_MARKER),
        }
    }
}

impl FromStr for Score {
    type Err = std::num::ParseFloatError;

    /// Parses a results-table cell. The `N/A` marker maps to `Unavailable`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == UNAVAILABLE_MARKER {
            return Ok(Score::Unavailable);
        }
        s.parse::<f64>().map(Score::from_value)
    }
}
