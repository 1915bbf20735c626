//! Propagation Mechanisms
//!
//! Decide whom a user contacts. Gated policies only choose neighbours that
//! have not been contacted in the last `wait_time` iterations.

use diffusion_events::UserIdx;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use socnet_graph::Orientation;
use std::collections::HashMap;

use super::{check_probability, check_user, Contacts, MechanismContext, PropagationMechanism};
use crate::error::ConfigError;
use crate::state::UserState;

/// Picks one candidate not contacted within `wait_time` iterations.
fn choose_available(
    candidates: &[UserIdx],
    user: UserIdx,
    state: &UserState,
    iteration: u64,
    wait_time: u64,
    rng: &mut SmallRng,
) -> Option<UserIdx> {
    let available: Vec<UserIdx> = candidates
        .iter()
        .copied()
        .filter(|&c| c != user && state.can_contact(c, iteration, wait_time))
        .collect();
    available.choose(rng).copied()
}

/// Pushes selected pieces to one neighbour.
#[derive(Debug, Clone)]
pub struct PushPropagation {
    pub wait_time: u64,
    pub orientation: Orientation,
}

impl PushPropagation {
    pub fn new(wait_time: u64) -> Self {
        Self {
            wait_time,
            orientation: Orientation::Out,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

impl PropagationMechanism for PushPropagation {
    fn contacts(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        state: &UserState,
        has_pieces: bool,
        rng: &mut SmallRng,
    ) -> Contacts {
        if !has_pieces {
            return Contacts::none();
        }
        let neighbours = ctx.data.neighbours(user, self.orientation);
        choose_available(&neighbours, user, state, ctx.iteration, self.wait_time, rng)
            .map(Contacts::push_to)
            .unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "push"
    }
}

/// Pulls the selected pieces of one neighbour.
///
/// Pulling never bypasses the source's own selection: only what the source
/// selected this iteration is delivered.
#[derive(Debug, Clone)]
pub struct PullPropagation {
    pub wait_time: u64,
    pub orientation: Orientation,
}

impl PullPropagation {
    pub fn new(wait_time: u64) -> Self {
        Self {
            wait_time,
            orientation: Orientation::In,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

impl PropagationMechanism for PullPropagation {
    fn contacts(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        state: &UserState,
        _has_pieces: bool,
        rng: &mut SmallRng,
    ) -> Contacts {
        let neighbours = ctx.data.neighbours(user, self.orientation);
        choose_available(&neighbours, user, state, ctx.iteration, self.wait_time, rng)
            .map(Contacts::pull_from)
            .unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "pull"
    }
}

/// Exchanges pieces with one neighbour in both directions.
#[derive(Debug, Clone)]
pub struct PushPullPropagation {
    pub wait_time: u64,
    pub orientation: Orientation,
}

impl PushPullPropagation {
    pub fn new(wait_time: u64) -> Self {
        Self {
            wait_time,
            orientation: Orientation::Und,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

impl PropagationMechanism for PushPullPropagation {
    fn contacts(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        state: &UserState,
        has_pieces: bool,
        rng: &mut SmallRng,
    ) -> Contacts {
        let neighbours = ctx.data.neighbours(user, self.orientation);
        match choose_available(&neighbours, user, state, ctx.iteration, self.wait_time, rng) {
            Some(partner) => Contacts {
                push: if has_pieces { vec![partner] } else { Vec::new() },
                pull: vec![partner],
            },
            None => Contacts::none(),
        }
    }

    fn name(&self) -> &'static str {
        "push_pull"
    }
}

/// Push that follows an external recommendation list with probability
/// `rec_prob` and a structural neighbour otherwise.
#[derive(Debug, Clone)]
pub struct RecommenderPropagation {
    pub wait_time: u64,
    pub orientation: Orientation,
    rec_prob: f64,
    recommendations: HashMap<UserIdx, Vec<UserIdx>>,
}

impl RecommenderPropagation {
    pub fn new(
        wait_time: u64,
        rec_prob: f64,
        recommendations: HashMap<UserIdx, Vec<UserIdx>>,
    ) -> Result<Self, ConfigError> {
        check_probability(rec_prob, "recommendation probability")?;
        Ok(Self {
            wait_time,
            orientation: Orientation::Out,
            rec_prob,
            recommendations,
        })
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn rec_prob(&self) -> f64 {
        self.rec_prob
    }

    pub fn recommendations_for(&self, user: UserIdx) -> &[UserIdx] {
        self.recommendations
            .get(&user)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

impl PropagationMechanism for RecommenderPropagation {
    fn contacts(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        state: &UserState,
        has_pieces: bool,
        rng: &mut SmallRng,
    ) -> Contacts {
        if !has_pieces {
            return Contacts::none();
        }
        let recommended = self.recommendations_for(user);
        let structural = ctx.data.neighbours(user, self.orientation);
        let (first, second) = if rng.gen_bool(self.rec_prob) {
            (recommended, structural.as_slice())
        } else {
            (structural.as_slice(), recommended)
        };
        choose_available(first, user, state, ctx.iteration, self.wait_time, rng)
            .or_else(|| choose_available(second, user, state, ctx.iteration, self.wait_time, rng))
            .map(Contacts::push_to)
            .unwrap_or_default()
    }

    fn validate(&self, num_users: usize) -> Result<(), ConfigError> {
        for (user, recs) in &self.recommendations {
            check_user(*user, num_users, "propagation recommendations")?;
            for rec in recs {
                check_user(*rec, num_users, "propagation recommendations")?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recommender"
    }
}

/// Pushes selected pieces to every neighbour each iteration.
#[derive(Debug, Clone)]
pub struct AllNeighboursPropagation {
    pub orientation: Orientation,
}

impl AllNeighboursPropagation {
    pub fn new(orientation: Orientation) -> Self {
        Self { orientation }
    }
}

impl Default for AllNeighboursPropagation {
    fn default() -> Self {
        Self::new(Orientation::Out)
    }
}

impl PropagationMechanism for AllNeighboursPropagation {
    fn contacts(
        &self,
        user: UserIdx,
        ctx: &MechanismContext<'_>,
        _state: &UserState,
        has_pieces: bool,
        _rng: &mut SmallRng,
    ) -> Contacts {
        if !has_pieces {
            return Contacts::none();
        }
        Contacts {
            push: ctx.data.neighbours(user, self.orientation),
            pull: Vec::new(),
        }
    }

    fn name(&self) -> &'static str {
        "all_neighbours"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DiffusionData;
    use crate::mechanisms::testing::{chain_data, test_rng};
    use rand::SeedableRng;
    use socnet_graph::Graph;

    fn star_data() -> DiffusionData {
        // u0 -> u1, u0 -> u2, u0 -> u3
        let mut graph = Graph::directed();
        for i in 0..4 {
            graph.add_node(format!("u{}", i));
        }
        for i in 1..4 {
            graph.add_default_edge(&"u0".to_string(), &format!("u{}", i));
        }
        DiffusionData::builder(graph).build()
    }

    #[test]
    fn test_push_needs_pieces() {
        let data = chain_data(3);
        let ctx = MechanismContext::new(&data, 1, 1);
        let state = UserState::new(UserIdx(0));
        let push = PushPropagation::new(0);

        assert!(push.contacts(UserIdx(0), &ctx, &state, false, &mut test_rng()).is_empty());
        let contacts = push.contacts(UserIdx(0), &ctx, &state, true, &mut test_rng());
        assert_eq!(contacts, Contacts::push_to(UserIdx(1)));
        // last user has no out-neighbour
        assert!(push.contacts(UserIdx(2), &ctx, &state, true, &mut test_rng()).is_empty());
    }

    #[test]
    fn test_pull_uses_in_neighbours() {
        let data = chain_data(3);
        let ctx = MechanismContext::new(&data, 1, 1);
        let pull = PullPropagation::new(0);

        let state = UserState::new(UserIdx(2));
        let contacts = pull.contacts(UserIdx(2), &ctx, &state, false, &mut test_rng());
        assert_eq!(contacts, Contacts::pull_from(UserIdx(1)));
        let state = UserState::new(UserIdx(0));
        assert!(pull.contacts(UserIdx(0), &ctx, &state, true, &mut test_rng()).is_empty());
    }

    #[test]
    fn test_wait_time_blocks_recent_targets() {
        let data = star_data();
        let push = PushPropagation::new(5);
        let mut state = UserState::new(UserIdx(0));
        state.record_contact(UserIdx(1), 1);
        state.record_contact(UserIdx(2), 2);

        let ctx = MechanismContext::new(&data, 3, 3);
        for seed in 0..10 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let contacts = push.contacts(UserIdx(0), &ctx, &state, true, &mut rng);
            assert_eq!(contacts.push, vec![UserIdx(3)]);
        }

        state.record_contact(UserIdx(3), 3);
        let ctx = MechanismContext::new(&data, 4, 4);
        assert!(push.contacts(UserIdx(0), &ctx, &state, true, &mut test_rng()).is_empty());
    }

    #[test]
    fn test_push_pull_exchanges_with_one_partner() {
        let data = chain_data(3);
        let ctx = MechanismContext::new(&data, 1, 1);
        let state = UserState::new(UserIdx(1));
        let push_pull = PushPullPropagation::new(0);

        let contacts = push_pull.contacts(UserIdx(1), &ctx, &state, true, &mut test_rng());
        assert_eq!(contacts.push.len(), 1);
        assert_eq!(contacts.push, contacts.pull);

        let contacts = push_pull.contacts(UserIdx(1), &ctx, &state, false, &mut test_rng());
        assert!(contacts.push.is_empty());
        assert_eq!(contacts.pull.len(), 1);
    }

    #[test]
    fn test_recommender_follows_recommendations() {
        let data = star_data();
        let ctx = MechanismContext::new(&data, 1, 1);
        let state = UserState::new(UserIdx(1));
        // u1 has no structural out-neighbours, so only recommendations work
        let recs = HashMap::from([(UserIdx(1), vec![UserIdx(3)])]);

        let always = RecommenderPropagation::new(0, 1.0, recs.clone()).unwrap();
        let contacts = always.contacts(UserIdx(1), &ctx, &state, true, &mut test_rng());
        assert_eq!(contacts.push, vec![UserIdx(3)]);

        // falls back to recommendations when structure offers nothing
        let never = RecommenderPropagation::new(0, 0.0, recs.clone()).unwrap();
        let contacts = never.contacts(UserIdx(1), &ctx, &state, true, &mut test_rng());
        assert_eq!(contacts.push, vec![UserIdx(3)]);

        assert!(RecommenderPropagation::new(0, -0.1, recs.clone()).is_err());
        assert!(always.validate(4).is_ok());
        assert!(always.validate(3).is_err());
    }

    #[test]
    fn test_all_neighbours() {
        let data = star_data();
        let ctx = MechanismContext::new(&data, 1, 1);
        let state = UserState::new(UserIdx(0));
        let all = AllNeighboursPropagation::default();
        let contacts = all.contacts(UserIdx(0), &ctx, &state, true, &mut test_rng());
        assert_eq!(contacts.push, vec![UserIdx(1), UserIdx(2), UserIdx(3)]);
        assert!(all.contacts(UserIdx(0), &ctx, &state, false, &mut test_rng()).is_empty());
    }
}
