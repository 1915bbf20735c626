//! Scenario tests
//!
//! Small hand-checked networks run end to end through the public API.

use diffusion_core::mechanisms::{
    AllNotPropagatedExpiration, CountSelection, Limit, NoMorePropagated, NumIterations,
    PullPropagation, PushPropagation, PushPullPropagation, ResetUpdate, TimedExpiration,
};
use diffusion_core::{DiffusionData, Protocol, Simulation};
use diffusion_events::{Iteration, PieceIdx, UserIdx};
use socnet_graph::{Graph, Orientation};
use std::collections::{BTreeSet, HashSet};

const A: UserIdx = UserIdx(0);
const B: UserIdx = UserIdx(1);
const C: UserIdx = UserIdx(2);
const P0: PieceIdx = PieceIdx(0);

/// Directed chain A -> B -> C where A created p0 at t=0.
fn chain() -> DiffusionData {
    let mut graph = Graph::directed();
    for id in ["A", "B", "C"] {
        graph.add_node(id.to_string());
    }
    graph.add_default_edge(&"A".to_string(), &"B".to_string());
    graph.add_default_edge(&"B".to_string(), &"C".to_string());
    let mut builder = DiffusionData::builder(graph);
    builder.add_piece("p0", "A", 0);
    builder.build()
}

/// Ring of `n` users with a chord every third user; every fourth user
/// creates one piece.
fn ring(n: usize) -> DiffusionData {
    let mut graph = Graph::directed();
    let id = |i: usize| format!("u{}", i);
    for i in 0..n {
        graph.add_node(id(i));
    }
    for i in 0..n {
        graph.add_default_edge(&id(i), &id((i + 1) % n));
        if i % 3 == 0 {
            graph.add_default_edge(&id(i), &id((i + n / 2) % n));
        }
    }
    let mut builder = DiffusionData::builder(graph);
    for i in (0..n).step_by(4) {
        builder.add_piece(&format!("p{}", i), &id(i), 0);
    }
    builder.build()
}

fn received(sim: &Simulation<'_>, user: UserIdx) -> BTreeSet<PieceIdx> {
    sim.user_state(user).unwrap().received().keys().copied().collect()
}

fn propagated(sim: &Simulation<'_>, user: UserIdx) -> BTreeSet<PieceIdx> {
    sim.user_state(user).unwrap().propagated().clone()
}

/// Push along the chain: one hop per iteration.
#[test]
fn test_push_chain() {
    let data = chain();
    let protocol = Protocol::builder()
        .selection(CountSelection::new(Limit::AtMost(1), Limit::AtMost(1)))
        .propagation(PushPropagation::new(0))
        .stop(NumIterations(5))
        .build()
        .unwrap();
    let mut sim = Simulation::new(&data, protocol, 7).unwrap();

    sim.step().unwrap();
    assert!(sim.user_state(A).unwrap().is_own(P0));

    let first = sim.step().unwrap().clone();
    assert_eq!(first.propagated_by(A), &[P0]);
    assert_eq!(received(&sim, B), BTreeSet::from([P0]));
    assert!(received(&sim, C).is_empty());

    let second = sim.step().unwrap().clone();
    assert_eq!(second.propagated_by(B), &[P0]);
    assert_eq!(propagated(&sim, B), BTreeSet::from([P0]));
    assert!(received(&sim, B).is_empty());
    assert_eq!(received(&sim, C), BTreeSet::from([P0]));
    assert_eq!(sim.total_propagated(), 2);
}

/// Without a received-piece allowance nothing moves past the first hop.
#[test]
fn test_push_without_received_allowance_stalls() {
    let data = chain();
    let protocol = Protocol::builder()
        .selection(CountSelection::new(Limit::AtMost(1), Limit::AtMost(0)))
        .propagation(PushPropagation::new(0))
        .stop(NumIterations(4))
        .build()
        .unwrap();
    let mut sim = Simulation::new(&data, protocol, 7).unwrap();
    sim.run();
    assert_eq!(received(&sim, B), BTreeSet::from([P0]));
    assert!(received(&sim, C).is_empty());
    assert_eq!(sim.total_propagated(), 1);
}

/// Pulling from B yields nothing until B holds the piece and offers it.
#[test]
fn test_pull_two_hop_delay() {
    let data = chain();
    let protocol = Protocol::builder()
        .selection(CountSelection::new(Limit::AtMost(1), Limit::AtMost(1)))
        .propagation(PullPropagation::new(0).with_orientation(Orientation::In))
        .stop(NumIterations(5))
        .build()
        .unwrap();
    let mut sim = Simulation::new(&data, protocol, 11).unwrap();
    sim.step().unwrap();

    let first = sim.step().unwrap().clone();
    assert_eq!(received(&sim, B), BTreeSet::from([P0]));
    assert!(received(&sim, C).is_empty());
    assert!(first.seen_by(C).is_empty());
    assert_eq!(first.propagated_by(A), &[P0]);

    let second = sim.step().unwrap().clone();
    assert_eq!(received(&sim, C), BTreeSet::from([P0]));
    assert_eq!(second.seen_by(C)[0].senders, vec![B]);
    assert_eq!(propagated(&sim, B), BTreeSet::from([P0]));
}

/// A received piece that is never selected is forgotten and never
/// propagated afterwards.
///
/// Expiration allows one chance: p0 reaches B in iteration 1, B may select
/// it only in iteration 2, and since it does not, p0 is discarded at the
/// end of iteration 2 rather than kept for later iterations.
#[test]
fn test_all_not_propagated_expiration() {
    let data = chain();
    let protocol = Protocol::builder()
        .selection(CountSelection::new(Limit::AtMost(1), Limit::AtMost(0)))
        .propagation(PushPropagation::new(0))
        .expiration(AllNotPropagatedExpiration)
        .stop(NumIterations(6))
        .build()
        .unwrap();
    let mut sim = Simulation::new(&data, protocol, 3).unwrap();
    sim.step().unwrap();
    sim.step().unwrap();
    assert_eq!(received(&sim, B), BTreeSet::from([P0]));

    // iteration 2 was B's only chance; it passed, so p0 is dropped now
    let second = sim.step().unwrap().clone();
    assert_eq!(second.discarded_by(B), &[P0]);
    assert!(received(&sim, B).is_empty());
    assert!(sim.user_state(B).unwrap().discarded().contains_key(&P0));

    sim.run();
    assert!(!propagated(&sim, B).contains(&P0));
    assert!(received(&sim, C).is_empty());
}

/// `NumIterations(n)` runs the seeding step plus n diffusion steps.
#[test]
fn test_num_iterations_exact() {
    let data = ring(12);
    for n in [0u64, 1, 4, 9] {
        let protocol = Protocol::builder()
            .selection(CountSelection::new(Limit::All, Limit::All))
            .propagation(PushPullPropagation::new(1))
            .stop(NumIterations(n))
            .build()
            .unwrap();
        let mut sim = Simulation::new(&data, protocol, 5).unwrap();
        let history = sim.run();
        assert_eq!(history.len() as u64, n + 1);
        assert_eq!(history.last().unwrap().number, n);
    }
}

/// A quiescent run stops on its own.
#[test]
fn test_no_more_propagated_stops() {
    let data = chain();
    let protocol = Protocol::builder()
        .selection(CountSelection::new(Limit::All, Limit::All))
        .propagation(PushPropagation::new(0))
        .stop(NoMorePropagated)
        .build()
        .unwrap();
    let mut sim = Simulation::new(&data, protocol, 1).unwrap();
    let history = sim.run();
    // seed, A pushes, B pushes, C has nobody to push to
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].num_new_propagated, 0);
}

fn busy_protocol() -> Protocol {
    Protocol::builder()
        .selection(CountSelection::new(Limit::AtMost(1), Limit::AtMost(2)))
        .propagation(PushPullPropagation::new(1).with_orientation(Orientation::Und))
        .update(ResetUpdate)
        .expiration(TimedExpiration::new(3).unwrap())
        .stop(NumIterations(25))
        .build()
        .unwrap()
}

fn propagation_events(history: &[Iteration]) -> Vec<(UserIdx, PieceIdx)> {
    history
        .iter()
        .flat_map(|it| {
            it.propagated
                .iter()
                .flat_map(|(&user, pieces)| pieces.iter().map(move |&p| (user, p)))
        })
        .collect()
}

/// Propagated sets only grow.
#[test]
fn test_propagated_sets_are_monotone() {
    let data = ring(20);
    let mut sim = Simulation::new(&data, busy_protocol(), 99).unwrap();
    let mut previous: Vec<BTreeSet<PieceIdx>> = vec![BTreeSet::new(); data.num_users()];
    while !sim.is_stopped() {
        sim.step().unwrap();
        for (user, before) in previous.iter_mut().enumerate() {
            let now = propagated(&sim, UserIdx::new(user));
            assert!(before.is_subset(&now), "user {} lost a propagated piece", user);
            *before = now;
        }
    }
    assert!(sim.total_propagated() > 0);
}

/// Each (user, piece) first propagation is recorded once and matches the
/// final states.
#[test]
fn test_no_double_count() {
    let data = ring(20);
    let mut sim = Simulation::new(&data, busy_protocol(), 4).unwrap();
    sim.run();
    let events = propagation_events(sim.iterations());
    let unique: HashSet<_> = events.iter().copied().collect();
    assert_eq!(events.len(), unique.len());
    assert_eq!(events.len(), sim.total_propagated());

    let from_states: HashSet<_> = sim
        .states()
        .iter()
        .flat_map(|s| s.propagated().iter().map(move |&p| (s.user(), p)))
        .collect();
    assert_eq!(unique, from_states);

    let recorded: usize = sim.iterations().iter().map(|it| it.num_new_propagated).sum();
    assert_eq!(recorded, sim.total_propagated());
}

/// Total propagations never exceed users times pieces.
#[test]
fn test_conservation() {
    let data = ring(16);
    let protocol = Protocol::builder()
        .selection(CountSelection::new(Limit::All, Limit::All))
        .propagation(PushPullPropagation::new(0).with_orientation(Orientation::Und))
        .stop(NumIterations(40))
        .build()
        .unwrap();
    let mut sim = Simulation::new(&data, protocol, 8).unwrap();
    sim.run();
    let bound = data.num_users() * data.num_pieces();
    for it in sim.iterations() {
        assert!(it.total_propagated <= bound);
        assert!(it.total_propagating_users <= data.num_users());
    }
    assert!(sim.propagating_users() <= data.num_users());
}
