//! Severity signal definitions.
//!
//! Defines [`Signal`], the three-level severity scale attached to every
//! insight an agent emits. Signals only ever escalate when combined:
//! the overall signal of a report set is the highest severity present.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an insight or of an aggregated run.
///
/// Ordering is `Info < Warn < Error`, so `max()` over a set of signals
/// yields the escalated run-level signal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Informational finding, no action required
    #[default]
    Info,
    /// Degraded or suspicious condition worth surfacing
    Warn,
    /// Failure condition; may fail the run under fail-fast policies
    Error,
}

impl Signal {
    /// Numeric severity rank (`Info` = 0, `Warn` = 1, `Error` = 2).
    pub fn rank(&self) -> u8 {
        match self {
            Signal::Info => 0,
            Signal::Warn => 1,
            Signal::Error => 2,
        }
    }

    /// Check if this signal is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Signal::Error)
    }

    /// Escalate: return the more severe of `self` and `other`.
    pub fn escalate(self, other: Signal) -> Signal {
        self.max(other)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Info => write!(f, "info"),
            Signal::Warn => write!(f, "warn"),
            Signal::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Signal::Info),
            "warn" | "warning" => Ok(Signal::Warn),
            "error" | "err" => Ok(Signal::Error),
            _ => Err(format!("Invalid Signal: {}", s)),
        }
    }
}
