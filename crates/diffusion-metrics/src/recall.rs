//! Ground-Truth Recall
//!
//! Compares simulated first propagations with the recorded ones. Creators
//! propagating their own pieces are trivially right, so they are left out
//! on both sides.

use diffusion_core::{DiffusionData, UserState};
use diffusion_events::{Iteration, PieceIdx, UserIdx};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Recall and precision of a run against the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealPropagationRecall {
    /// Simulated repropagations also present in the ground truth.
    pub hits: usize,
    /// Simulated repropagations (creators excluded).
    pub simulated: usize,
    /// Recorded repropagations (creators excluded).
    pub real: usize,
}

fn is_creator(data: &DiffusionData, user: UserIdx, piece: PieceIdx) -> bool {
    data.creators(piece).contains(&user)
}

fn real_set(data: &DiffusionData) -> Option<BTreeSet<(UserIdx, PieceIdx)>> {
    let truth = data.real_propagation()?;
    Some(
        truth
            .iter()
            .map(|(user, piece, _)| (user, piece))
            .filter(|&(user, piece)| !is_creator(data, user, piece))
            .collect(),
    )
}

impl RealPropagationRecall {
    /// Scores final states. `None` when the data has no ground truth.
    pub fn compute(data: &DiffusionData, states: &[UserState]) -> Option<Self> {
        let real = real_set(data)?;
        let simulated: BTreeSet<(UserIdx, PieceIdx)> = states
            .iter()
            .flat_map(|s| s.propagated().iter().map(move |&p| (s.user(), p)))
            .filter(|&(user, piece)| !is_creator(data, user, piece))
            .collect();
        Some(Self::from_sets(&real, &simulated))
    }

    /// Cumulative scores after every iteration of a history.
    pub fn curve(data: &DiffusionData, history: &[Iteration]) -> Option<Vec<Self>> {
        let real = real_set(data)?;
        let mut simulated = BTreeSet::new();
        let curve = history
            .iter()
            .map(|it| {
                for (&user, pieces) in &it.propagated {
                    for &piece in pieces {
                        if !is_creator(data, user, piece) {
                            simulated.insert((user, piece));
                        }
                    }
                }
                Self::from_sets(&real, &simulated)
            })
            .collect();
        Some(curve)
    }

    fn from_sets(real: &BTreeSet<(UserIdx, PieceIdx)>, simulated: &BTreeSet<(UserIdx, PieceIdx)>) -> Self {
        Self {
            hits: simulated.intersection(real).count(),
            simulated: simulated.len(),
            real: real.len(),
        }
    }

    /// Share of recorded repropagations the run reproduced; 0 when there
    /// are none.
    pub fn recall(&self) -> f64 {
        ratio(self.hits, self.real)
    }

    /// Share of simulated repropagations that are recorded; 0 when the run
    /// has none.
    pub fn precision(&self) -> f64 {
        ratio(self.hits, self.simulated)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
