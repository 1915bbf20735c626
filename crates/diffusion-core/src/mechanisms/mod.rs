//! Diffusion Mechanisms
//!
//! Pluggable policies composed into a [`Protocol`](crate::Protocol):
//!
//! - [`SelectionMechanism`]: which held pieces a user propagates this step
//! - [`PropagationMechanism`]: whom the user pushes to and pulls from
//! - [`UpdateMechanism`]: how repeated deliveries of a piece merge
//! - [`ExpirationMechanism`]: which pending pieces a user forgets
//! - [`StopCondition`]: when the run ends
//!
//! Mechanisms are invoked once per user per iteration against a frozen
//! snapshot. They keep no state across calls beyond their configuration;
//! randomness comes from the per-user stream passed in.

pub mod expiration;
pub mod propagation;
pub mod selection;
pub mod stop;
pub mod update;

pub use expiration::{
    AllNotPropagatedExpiration, NeverExpire, RealPropagatedTimestampExpiration, TimedExpiration,
};
pub use propagation::{
    AllNeighboursPropagation, PullPropagation, PushPropagation, PushPullPropagation,
    RecommenderPropagation,
};
pub use selection::{CountSelection, RealPropagatedSelection, RecommendedSelection, ThresholdSelection};
pub use stop::{
    AnyOf, MaxTimestamp, NoMoreNew, NoMorePropagated, NumIterations, StopCounters, TotalPropagated,
    WallClock,
};
pub use update::{NewerUpdate, OlderUpdate, ResetUpdate};

use diffusion_events::{PieceIdx, UserIdx};
use rand::rngs::SmallRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::DiffusionData;
use crate::error::ConfigError;
use crate::state::{ReceivedInfo, UserState};

/// Read-only view handed to mechanisms.
#[derive(Debug, Clone, Copy)]
pub struct MechanismContext<'a> {
    pub data: &'a DiffusionData,
    pub iteration: u64,
    pub timestamp: i64,
}

impl<'a> MechanismContext<'a> {
    pub fn new(data: &'a DiffusionData, iteration: u64, timestamp: i64) -> Self {
        Self {
            data,
            iteration,
            timestamp,
        }
    }
}

/// Upper bound on how many pieces a selection takes from a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    All,
    AtMost(usize),
}

impl Limit {
    /// How many of `available` pieces to take.
    pub fn take(self, available: usize) -> usize {
        match self {
            Limit::All => available,
            Limit::AtMost(n) => n.min(available),
        }
    }

    pub fn is_zero(self) -> bool {
        self == Limit::AtMost(0)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::All => write!(f, "all"),
            Limit::AtMost(n) => write!(f, "{}", n),
        }
    }
}

/// Users contacted by one user in one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contacts {
    /// Receive the user's selected pieces.
    pub push: Vec<UserIdx>,
    /// Have their selected pieces delivered to the user.
    pub pull: Vec<UserIdx>,
}

impl Contacts {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn push_to(target: UserIdx) -> Self {
        Self {
            push: vec![target],
            pull: Vec::new(),
        }
    }

    pub fn pull_from(source: UserIdx) -> Self {
        Self {
            push: Vec::new(),
            pull: vec![source],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.push.is_empty() && self.pull.is_empty()
    }
}

/// Chooses the pieces a user propagates this iteration.
pub trait SelectionMechanism: Send + Sync + fmt::Debug {
    /// Returns own pieces first, then received ones. Only pieces the user
    /// still holds may be returned.
    fn select(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        state: &UserState,
        rng: &mut SmallRng,
    ) -> Vec<PieceIdx>;

    /// Checks parameters that depend on the population.
    fn validate(&self, _num_users: usize) -> Result<(), ConfigError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Chooses the users a user exchanges pieces with.
pub trait PropagationMechanism: Send + Sync + fmt::Debug {
    /// `has_pieces` tells whether the user selected anything to push.
    fn contacts(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        state: &UserState,
        has_pieces: bool,
        rng: &mut SmallRng,
    ) -> Contacts;

    fn validate(&self, _num_users: usize) -> Result<(), ConfigError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Merges metadata of repeated deliveries.
///
/// Both operations must be commutative and associative: the engine folds
/// deliveries in an unspecified order.
pub trait UpdateMechanism: Send + Sync + fmt::Debug {
    /// Merges a delivery into a pending piece.
    fn update_seen(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo;

    /// Merges a delivery into a previously discarded piece.
    fn update_discarded(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo;

    fn name(&self) -> &'static str;
}

/// Chooses pending pieces a user forgets at the end of an iteration.
pub trait ExpirationMechanism: Send + Sync + fmt::Debug {
    fn expire(&self, state: &UserState, ctx: &MechanismContext<'_>) -> Vec<PieceIdx>;

    fn validate(&self, _num_users: usize) -> Result<(), ConfigError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Decides when a run ends.
pub trait StopCondition: Send + Sync + fmt::Debug {
    fn stop(&self, counters: &StopCounters) -> bool;

    fn name(&self) -> &'static str;
}

/// Picks `limit` pieces from `pool` uniformly at random, keeping pool order.
pub(crate) fn sample_pieces(pool: &[PieceIdx], limit: Limit, rng: &mut SmallRng) -> Vec<PieceIdx> {
    let k = limit.take(pool.len());
    if k == pool.len() {
        return pool.to_vec();
    }
    let mut picked = sample(rng, pool.len(), k).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| pool[i]).collect()
}

/// Checks a user index coming from configuration.
pub(crate) fn check_user(user: UserIdx, num_users: usize, what: &str) -> Result<(), ConfigError> {
    if user.index() < num_users {
        Ok(())
    } else {
        Err(ConfigError::bad(format!(
            "{} references user {} but there are only {} users",
            what, user, num_users
        )))
    }
}

/// Checks a probability parameter.
pub(crate) fn check_probability(value: f64, what: &str) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::bad(format!("{} must be in [0, 1], got {}", what, value)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_limit() {
        assert_eq!(Limit::All.take(5), 5);
        assert_eq!(Limit::AtMost(2).take(5), 2);
        assert_eq!(Limit::AtMost(9).take(5), 5);
        assert!(Limit::AtMost(0).is_zero());
        assert_eq!(Limit::All.to_string(), "all");
    }

    #[test]
    fn test_sample_pieces() {
        let pool: Vec<PieceIdx> = (0..10).map(PieceIdx).collect();
        let mut rng = SmallRng::seed_from_u64(1);

        assert_eq!(sample_pieces(&pool, Limit::All, &mut rng), pool);
        assert!(sample_pieces(&pool, Limit::AtMost(0), &mut rng).is_empty());

        let picked = sample_pieces(&pool, Limit::AtMost(3), &mut rng);
        assert_eq!(picked.len(), 3);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_checks() {
        assert!(check_user(UserIdx(2), 3, "x").is_ok());
        assert!(check_user(UserIdx(3), 3, "x").is_err());
        assert!(check_probability(0.5, "p").is_ok());
        assert!(check_probability(1.5, "p").is_err());
        assert!(check_probability(f64::NAN, "p").is_err());
    }
}
