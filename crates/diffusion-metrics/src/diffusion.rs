//! Diffusion Metrics
//!
//! Measures computed from an iteration history and the final user states:
//! how far pieces spread, how fast, and how unevenly.

use diffusion_core::UserState;
use diffusion_events::{Iteration, UserIdx};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Cumulative progress of a run after one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub iteration: u64,
    pub timestamp: i64,
    pub total_propagated: usize,
    pub propagating_users: usize,
    /// Users who have held at least one piece they did not create.
    pub reached_users: usize,
}

/// One point per iteration, in history order.
pub fn spread_curve(history: &[Iteration]) -> Vec<SpreadPoint> {
    let mut reached: HashSet<UserIdx> = HashSet::new();
    history
        .iter()
        .map(|it| {
            reached.extend(it.seen.keys().copied());
            SpreadPoint {
                iteration: it.number,
                timestamp: it.timestamp,
                total_propagated: it.total_propagated,
                propagating_users: it.total_propagating_users,
                reached_users: reached.len(),
            }
        })
        .collect()
}

/// True if the user ever held a piece created by someone else.
fn was_reached(state: &UserState) -> bool {
    !state.received().is_empty()
        || !state.discarded().is_empty()
        || state.propagated().iter().any(|p| !state.is_own(*p))
}

/// Share of users reached by at least one piece they did not create.
pub fn coverage(states: &[UserState]) -> f64 {
    if states.is_empty() {
        return 0.0;
    }
    let reached = states.iter().filter(|s| was_reached(s)).count();
    reached as f64 / states.len() as f64
}

/// Distinct users who received each piece, indexed by piece.
///
/// Creators are not counted. Pieces beyond `num_pieces` are ignored.
pub fn piece_reach(history: &[Iteration], num_pieces: usize) -> Vec<usize> {
    let mut receivers: Vec<BTreeSet<UserIdx>> = vec![BTreeSet::new(); num_pieces];
    for it in history {
        for (&user, pieces) in &it.seen {
            for seen in pieces {
                if let Some(set) = receivers.get_mut(seen.piece.index()) {
                    set.insert(user);
                }
            }
        }
    }
    receivers.iter().map(BTreeSet::len).collect()
}

/// Gini coefficient of non-negative values.
///
/// 0 means perfectly even; values approach 1 as everything concentrates on
/// one entry. Empty or all-zero inputs give 0.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    let total: f64 = values.iter().sum();
    if n == 0 || total <= 0.0 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64 + 1.0) * v)
        .sum();
    let n = n as f64;
    (2.0 * weighted) / (n * total) - (n + 1.0) / n
}

/// Inequality of first-propagation counts across users.
pub fn user_propagation_gini(states: &[UserState]) -> f64 {
    let counts: Vec<f64> = states.iter().map(|s| s.propagated().len() as f64).collect();
    gini(&counts)
}

/// Inequality of reach across pieces.
pub fn piece_reach_gini(reach: &[usize]) -> f64 {
    let values: Vec<f64> = reach.iter().map(|&r| r as f64).collect();
    gini(&values)
}

/// Iteration at which each piece was first propagated, if ever.
pub fn first_propagation(history: &[Iteration], num_pieces: usize) -> Vec<Option<u64>> {
    let mut first = vec![None; num_pieces];
    for it in history {
        for piece in it.propagated.values().flatten() {
            if let Some(slot) = first.get_mut(piece.index()) {
                slot.get_or_insert(it.number);
            }
        }
    }
    first
}
