//! Stop Conditions
//!
//! Evaluated after every iteration against explicit counters.

use std::time::Duration;

use super::StopCondition;

/// Counters describing the iteration just completed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StopCounters {
    pub iteration: u64,
    pub timestamp: i64,
    /// First propagations in this iteration.
    pub new_propagated: usize,
    /// Pieces users saw for the first time in this iteration.
    pub new_seen: usize,
    pub total_propagated: usize,
    /// Distinct users who propagated so far.
    pub propagating_users: usize,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
}

/// Stops after iteration `n`, giving exactly `n + 1` iterations.
#[derive(Debug, Clone, Copy)]
pub struct NumIterations(pub u64);

impl StopCondition for NumIterations {
    fn stop(&self, counters: &StopCounters) -> bool {
        counters.iteration >= self.0
    }

    fn name(&self) -> &'static str {
        "num_iterations"
    }
}

/// Stops once an iteration propagates nothing new.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMorePropagated;

impl StopCondition for NoMorePropagated {
    fn stop(&self, counters: &StopCounters) -> bool {
        counters.iteration > 0 && counters.new_propagated == 0
    }

    fn name(&self) -> &'static str {
        "no_more_propagated"
    }
}

/// Stops once an iteration delivers nothing new to anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMoreNew;

impl StopCondition for NoMoreNew {
    fn stop(&self, counters: &StopCounters) -> bool {
        counters.iteration > 0 && counters.new_seen == 0
    }

    fn name(&self) -> &'static str {
        "no_more_new"
    }
}

/// Stops when the number of first propagations reaches a limit.
#[derive(Debug, Clone, Copy)]
pub struct TotalPropagated(pub usize);

impl StopCondition for TotalPropagated {
    fn stop(&self, counters: &StopCounters) -> bool {
        counters.total_propagated >= self.0
    }

    fn name(&self) -> &'static str {
        "total_propagated"
    }
}

/// Stops once the clock reaches a timestamp.
#[derive(Debug, Clone, Copy)]
pub struct MaxTimestamp(pub i64);

impl StopCondition for MaxTimestamp {
    fn stop(&self, counters: &StopCounters) -> bool {
        counters.timestamp >= self.0
    }

    fn name(&self) -> &'static str {
        "max_timestamp"
    }
}

/// Stops after a wall-clock budget. Runs using it are not reproducible.
#[derive(Debug, Clone, Copy)]
pub struct WallClock(pub Duration);

impl StopCondition for WallClock {
    fn stop(&self, counters: &StopCounters) -> bool {
        counters.elapsed >= self.0
    }

    fn name(&self) -> &'static str {
        "wall_clock"
    }
}

/// Stops as soon as any inner condition does.
#[derive(Debug, Default)]
pub struct AnyOf(pub Vec<Box<dyn StopCondition>>);

impl AnyOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: impl StopCondition + 'static) -> Self {
        self.0.push(Box::new(condition));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl StopCondition for AnyOf {
    fn stop(&self, counters: &StopCounters) -> bool {
        self.0.iter().any(|c| c.stop(counters))
    }

    fn name(&self) -> &'static str {
        "any_of"
    }
}
