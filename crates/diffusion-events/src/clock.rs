//! Simulation Clock
//!
//! Maps iteration numbers to timestamps. Expiration policies and stop
//! conditions that work against recorded data compare against the
//! timestamp of the current iteration.
//!
//! # Example
//!
//! ```
//! use diffusion_events::Clock;
//!
//! let clock: Clock = "1000:60".parse().unwrap();
//! assert_eq!(clock.timestamp_at(0), 1000);
//! assert_eq!(clock.timestamp_at(3), 1180);
//! assert_eq!(clock.to_string(), "1000:60");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linear clock: `timestamp = start + iteration * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Clock {
    pub start: i64,
    pub step: i64,
}

impl Default for Clock {
    /// Timestamps equal iteration numbers.
    fn default() -> Self {
        Self { start: 0, step: 1 }
    }
}

impl Clock {
    pub fn new(start: i64, step: i64) -> Self {
        Self { start, step }
    }

    /// Timestamp of an iteration (saturating).
    pub fn timestamp_at(&self, iteration: u64) -> i64 {
        let iteration = i64::try_from(iteration).unwrap_or(i64::MAX);
        self.start.saturating_add(iteration.saturating_mul(self.step))
    }

    /// First iteration whose timestamp is at least `timestamp`.
    ///
    /// Returns `None` for a non-positive step, where timestamps never grow.
    pub fn iteration_reaching(&self, timestamp: i64) -> Option<u64> {
        if self.step <= 0 {
            return None;
        }
        if timestamp <= self.start {
            return Some(0);
        }
        let diff = timestamp.abs_diff(self.start);
        Some(diff.div_ceil(self.step.unsigned_abs()))
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.step)
    }
}

/// Error type for parsing a clock from `start:step`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseClockError {
    InvalidFormat(String),
    InvalidNumber(String),
}

impl fmt::Display for ParseClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseClockError::InvalidFormat(s) => {
                write!(f, "invalid clock format: '{}', expected 'start:step'", s)
            }
            ParseClockError::InvalidNumber(s) => write!(f, "invalid clock number: '{}'", s),
        }
    }
}

impl std::error::Error for ParseClockError {}

impl FromStr for Clock {
    type Err = ParseClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, step) = s
            .split_once(':')
            .ok_or_else(|| ParseClockError::InvalidFormat(s.to_string()))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| ParseClockError::InvalidNumber(v.to_string()))
        };
        Ok(Clock::new(parse(start)?, parse(step)?))
    }
}
