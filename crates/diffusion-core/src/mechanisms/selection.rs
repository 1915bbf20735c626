//! Selection Mechanisms
//!
//! Each policy bounds how many own pieces (`num_own`) and received pieces
//! (`num_rec`) a user propagates per iteration.

use diffusion_events::{PieceIdx, UserIdx};
use rand::rngs::SmallRng;
use rand::Rng;
use std::collections::{BTreeSet, HashMap};

use super::{check_probability, check_user, sample_pieces, Limit, MechanismContext, SelectionMechanism};
use crate::error::ConfigError;
use crate::state::UserState;

fn pending_own(state: &UserState) -> Vec<PieceIdx> {
    state.pending_own().collect()
}

/// Random subsets of own and received pieces.
#[derive(Debug, Clone)]
pub struct CountSelection {
    pub num_own: Limit,
    pub num_rec: Limit,
}

impl CountSelection {
    pub fn new(num_own: Limit, num_rec: Limit) -> Self {
        Self { num_own, num_rec }
    }
}

impl SelectionMechanism for CountSelection {
    fn select(
        &self,
        _user: UserIdx,
        _ctx: &MechanismContext<'_>,
        state: &UserState,
        rng: &mut SmallRng,
    ) -> Vec<PieceIdx> {
        let received: Vec<PieceIdx> = state.received().keys().copied().collect();
        let mut selected = sample_pieces(&pending_own(state), self.num_own, rng);
        selected.extend(sample_pieces(&received, self.num_rec, rng));
        selected
    }

    fn name(&self) -> &'static str {
        "count"
    }
}

/// Received pieces become eligible after `threshold` deliveries.
#[derive(Debug, Clone)]
pub struct ThresholdSelection {
    pub num_own: Limit,
    pub num_rec: Limit,
    threshold: u32,
}

impl ThresholdSelection {
    pub fn new(num_own: Limit, num_rec: Limit, threshold: u32) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::bad("selection threshold must be at least 1"));
        }
        Ok(Self {
            num_own,
            num_rec,
            threshold,
        })
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl SelectionMechanism for ThresholdSelection {
    fn select(
        &self,
        _user: UserIdx,
        _ctx: &MechanismContext<'_>,
        state: &UserState,
        rng: &mut SmallRng,
    ) -> Vec<PieceIdx> {
        let eligible: Vec<PieceIdx> = state
            .received()
            .values()
            .filter(|info| info.times >= self.threshold)
            .map(|info| info.piece)
            .collect();
        let mut selected = sample_pieces(&pending_own(state), self.num_own, rng);
        selected.extend(sample_pieces(&eligible, self.num_rec, rng));
        selected
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}

/// Biases received picks toward pieces sent by recommended neighbours.
///
/// Every received pick comes, with probability `prob`, from pieces with at
/// least one recommended sender, otherwise from the rest. When the chosen
/// pool is exhausted the pick falls back to the other one.
#[derive(Debug, Clone)]
pub struct RecommendedSelection {
    pub num_own: Limit,
    pub num_rec: Limit,
    prob: f64,
    recommended: HashMap<UserIdx, BTreeSet<UserIdx>>,
}

impl RecommendedSelection {
    pub fn new(
        num_own: Limit,
        num_rec: Limit,
        prob: f64,
        recommended: HashMap<UserIdx, BTreeSet<UserIdx>>,
    ) -> Result<Self, ConfigError> {
        check_probability(prob, "selection probability")?;
        Ok(Self {
            num_own,
            num_rec,
            prob,
            recommended,
        })
    }

    pub fn prob(&self) -> f64 {
        self.prob
    }
}

impl SelectionMechanism for RecommendedSelection {
    fn select(
        &self,
        user: UserIdx,
        _ctx: &MechanismContext<'_>,
        state: &UserState,
        rng: &mut SmallRng,
    ) -> Vec<PieceIdx> {
        let mut selected = sample_pieces(&pending_own(state), self.num_own, rng);

        let empty = BTreeSet::new();
        let recommended = self.recommended.get(&user).unwrap_or(&empty);
        let mut preferred = Vec::new();
        let mut others = Vec::new();
        for info in state.received().values() {
            if info.senders.iter().any(|s| recommended.contains(s)) {
                preferred.push(info.piece);
            } else {
                others.push(info.piece);
            }
        }

        let mut picks = self.num_rec.take(preferred.len() + others.len());
        let mut received = Vec::with_capacity(picks);
        while picks > 0 {
            let use_preferred = if preferred.is_empty() {
                false
            } else if others.is_empty() {
                true
            } else {
                rng.gen_bool(self.prob)
            };
            let pool = if use_preferred { &mut preferred } else { &mut others };
            let at = rng.gen_range(0..pool.len());
            received.push(pool.swap_remove(at));
            picks -= 1;
        }
        received.sort_unstable();
        selected.extend(received);
        selected
    }

    fn validate(&self, num_users: usize) -> Result<(), ConfigError> {
        for (user, recs) in &self.recommended {
            check_user(*user, num_users, "selection recommendations")?;
            for rec in recs {
                check_user(*rec, num_users, "selection recommendations")?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recommended"
    }
}

/// Repropagates received pieces only when the ground truth says the user
/// did so.
#[derive(Debug, Clone)]
pub struct RealPropagatedSelection {
    pub num_own: Limit,
    pub num_rec: Limit,
}

impl RealPropagatedSelection {
    pub fn new(num_own: Limit, num_rec: Limit) -> Self {
        Self { num_own, num_rec }
    }
}

impl SelectionMechanism for RealPropagatedSelection {
    fn select(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        state: &UserState,
        rng: &mut SmallRng,
    ) -> Vec<PieceIdx> {
        let eligible: Vec<PieceIdx> = state
            .received()
            .keys()
            .copied()
            .filter(|&p| ctx.data.is_real_repropagated_piece(user, p))
            .collect();
        let mut selected = sample_pieces(&pending_own(state), self.num_own, rng);
        selected.extend(sample_pieces(&eligible, self.num_rec, rng));
        selected
    }

    fn name(&self) -> &'static str {
        "real_propagated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanisms::testing::{chain_data, received_from, test_rng};
    use rand::SeedableRng;

    #[test]
    fn test_count_selection_own_first() {
        let data = chain_data(3);
        let ctx = MechanismContext::new(&data, 1, 1);
        let mut state = UserState::new(UserIdx(1));
        state.add_own(PieceIdx(5));
        received_from(&mut state, 2, 0, 1);
        received_from(&mut state, 3, 0, 1);

        let all = CountSelection::new(Limit::All, Limit::All);
        let picked = all.select(UserIdx(1), &ctx, &state, &mut test_rng());
        assert_eq!(picked, vec![PieceIdx(5), PieceIdx(2), PieceIdx(3)]);

        let one_each = CountSelection::new(Limit::AtMost(1), Limit::AtMost(1));
        let picked = one_each.select(UserIdx(1), &ctx, &state, &mut test_rng());
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0], PieceIdx(5));
        assert!(state.has_received(picked[1]));

        let own_only = CountSelection::new(Limit::All, Limit::AtMost(0));
        let picked = own_only.select(UserIdx(1), &ctx, &state, &mut test_rng());
        assert_eq!(picked, vec![PieceIdx(5)]);
    }

    #[test]
    fn test_threshold_selection() {
        assert!(ThresholdSelection::new(Limit::All, Limit::All, 0).is_err());

        let data = chain_data(3);
        let ctx = MechanismContext::new(&data, 2, 2);
        let mut state = UserState::new(UserIdx(2));
        received_from(&mut state, 0, 0, 1);
        received_from(&mut state, 0, 1, 2);
        received_from(&mut state, 1, 1, 1);

        let selection = ThresholdSelection::new(Limit::All, Limit::All, 2).unwrap();
        let picked = selection.select(UserIdx(2), &ctx, &state, &mut test_rng());
        assert_eq!(picked, vec![PieceIdx(0)]);
    }

    #[test]
    fn test_recommended_selection_prefers_recommended_senders() {
        let data = chain_data(4);
        let ctx = MechanismContext::new(&data, 1, 1);
        let mut state = UserState::new(UserIdx(3));
        received_from(&mut state, 0, 0, 1);
        received_from(&mut state, 1, 1, 1);
        received_from(&mut state, 2, 2, 1);

        let recommended = HashMap::from([(UserIdx(3), BTreeSet::from([UserIdx(1)]))]);
        let always = RecommendedSelection::new(Limit::All, Limit::AtMost(1), 1.0, recommended.clone()).unwrap();
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            assert_eq!(always.select(UserIdx(3), &ctx, &state, &mut rng), vec![PieceIdx(1)]);
        }

        let never = RecommendedSelection::new(Limit::All, Limit::AtMost(2), 0.0, recommended.clone()).unwrap();
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            assert_eq!(never.select(UserIdx(3), &ctx, &state, &mut rng), vec![PieceIdx(0), PieceIdx(2)]);
        }

        // falls back when the preferred pool runs dry
        let greedy = RecommendedSelection::new(Limit::All, Limit::All, 1.0, recommended).unwrap();
        let picked = greedy.select(UserIdx(3), &ctx, &state, &mut test_rng());
        assert_eq!(picked, vec![PieceIdx(0), PieceIdx(1), PieceIdx(2)]);
    }

    #[test]
    fn test_recommended_selection_validation() {
        assert!(RecommendedSelection::new(Limit::All, Limit::All, 1.2, HashMap::new()).is_err());
        let recommended = HashMap::from([(UserIdx(0), BTreeSet::from([UserIdx(7)]))]);
        let selection = RecommendedSelection::new(Limit::All, Limit::All, 0.5, recommended).unwrap();
        assert!(selection.validate(8).is_ok());
        assert!(selection.validate(3).is_err());
    }

    #[test]
    fn test_real_propagated_selection() {
        let data = chain_data(3);
        let ctx = MechanismContext::new(&data, 1, 1);
        // chain_data records u1 repropagating p0 only
        let mut state = UserState::new(UserIdx(1));
        received_from(&mut state, 0, 0, 1);
        received_from(&mut state, 1, 0, 1);

        let selection = RealPropagatedSelection::new(Limit::All, Limit::All);
        let picked = selection.select(UserIdx(1), &ctx, &state, &mut test_rng());
        assert_eq!(picked, vec![PieceIdx(0)]);
    }
}
