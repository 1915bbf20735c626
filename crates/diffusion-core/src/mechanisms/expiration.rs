//! Expiration Mechanisms

use diffusion_events::PieceIdx;

use super::{ExpirationMechanism, MechanismContext};
use crate::error::ConfigError;
use crate::state::UserState;

/// Pending pieces are kept forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverExpire;

impl ExpirationMechanism for NeverExpire {
    fn expire(&self, _state: &UserState, _ctx: &MechanismContext<'_>) -> Vec<PieceIdx> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "never"
    }
}

/// Every pending piece gets one chance: if it was already pending when
/// this iteration's selection ran and was not propagated, it is dropped.
///
/// Pieces delivered during the current iteration survive until the next
/// one, so a re-delivery grants another chance.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllNotPropagatedExpiration;

impl ExpirationMechanism for AllNotPropagatedExpiration {
    fn expire(&self, state: &UserState, ctx: &MechanismContext<'_>) -> Vec<PieceIdx> {
        state
            .received()
            .values()
            .filter(|info| info.last_iteration < ctx.iteration)
            .map(|info| info.piece)
            .collect()
    }

    fn name(&self) -> &'static str {
        "all_not_propagated"
    }
}

/// Drops pieces whose recorded propagation by this user already lies in the
/// past. Pieces the user never propagated in the ground truth are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealPropagatedTimestampExpiration;

impl ExpirationMechanism for RealPropagatedTimestampExpiration {
    fn expire(&self, state: &UserState, ctx: &MechanismContext<'_>) -> Vec<PieceIdx> {
        let user = state.user();
        state
            .received()
            .keys()
            .copied()
            .filter(|&p| {
                ctx.data
                    .real_propagated_timestamp(user, p)
                    .map_or(false, |ts| ts < ctx.timestamp)
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "real_propagated_timestamp"
    }
}

/// Drops pieces first seen at least `max_age` iterations ago.
#[derive(Debug, Clone, Copy)]
pub struct TimedExpiration {
    max_age: u64,
}

impl TimedExpiration {
    pub fn new(max_age: u64) -> Result<Self, ConfigError> {
        if max_age == 0 {
            return Err(ConfigError::bad("expiration max_age must be at least 1"));
        }
        Ok(Self { max_age })
    }

    pub fn max_age(&self) -> u64 {
        self.max_age
    }
}

impl ExpirationMechanism for TimedExpiration {
    fn expire(&self, state: &UserState, ctx: &MechanismContext<'_>) -> Vec<PieceIdx> {
        state
            .received()
            .values()
            .filter(|info| ctx.iteration.saturating_sub(info.first_iteration) >= self.max_age)
            .map(|info| info.piece)
            .collect()
    }

    fn name(&self) -> &'static str {
        "timed"
    }
}
