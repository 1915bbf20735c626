//! Run Summary
//!
//! Small descriptor written next to a checkpoint so that readers can tell
//! runs apart and sanity-check what they load.

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Generates a unique run identifier.
pub fn generate_run_id() -> String {
    format!("run_{}", uuid::Uuid::new_v4().simple())
}

/// Descriptor of a (possibly unfinished) simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub seed: u64,
    pub clock: Clock,
    pub num_users: usize,
    pub num_pieces: usize,
    /// Iterations recorded, including the seeding step.
    pub iterations: u64,
    pub total_propagated: usize,
    pub total_propagating_users: usize,
    /// True when the stop condition ended the run.
    pub stopped: bool,
}

impl RunSummary {
    /// Share of users who propagated at least once.
    pub fn propagating_share(&self) -> f64 {
        if self.num_users == 0 {
            0.0
        } else {
            self.total_propagating_users as f64 / self.num_users as f64
        }
    }
}
