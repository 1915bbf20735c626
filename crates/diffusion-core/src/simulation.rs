//! Simulation
//!
//! Drives a [`Protocol`] over [`DiffusionData`], one iteration per
//! [`Simulation::step`]. Iteration 0 seeds every creator with its own
//! pieces; each later iteration plans, commits, expires and records.

use diffusion_events::{Clock, Iteration, RunSummary, UserIdx};
use std::time::Instant;

use crate::checkpoint::Checkpoint;
use crate::commit::{apply_deliveries, collect_deliveries, record_contacts, Plan};
use crate::data::DiffusionData;
use crate::error::SimulationError;
use crate::mechanisms::{MechanismContext, StopCounters};
use crate::protocol::Protocol;
use crate::rng::user_rng;
use crate::state::UserState;

/// Lifecycle of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStatus {
    NotStarted,
    Running,
    Stopped,
}

/// A diffusion run over borrowed data.
#[derive(Debug)]
pub struct Simulation<'a> {
    data: &'a DiffusionData,
    protocol: Protocol,
    seed: u64,
    clock: Clock,
    states: Vec<UserState>,
    history: Vec<Iteration>,
    status: SimulationStatus,
    propagators: Vec<bool>,
    num_propagators: usize,
    total_propagated: usize,
    started: Option<Instant>,
    #[cfg(feature = "parallel")]
    parallel_plan: bool,
}

impl<'a> Simulation<'a> {
    /// Creates a simulation, validating the protocol against the data.
    pub fn new(data: &'a DiffusionData, protocol: Protocol, seed: u64) -> Result<Self, SimulationError> {
        protocol.validate(data.num_users())?;
        Ok(Self {
            data,
            protocol,
            seed,
            clock: Clock::default(),
            states: data.users().map(UserState::new).collect(),
            history: Vec::new(),
            status: SimulationStatus::NotStarted,
            propagators: vec![false; data.num_users()],
            num_propagators: 0,
            total_propagated: 0,
            started: None,
            #[cfg(feature = "parallel")]
            parallel_plan: true,
        })
    }

    /// Uses a custom clock for iteration timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Switches the plan phase between the rayon pool and the calling
    /// thread. Both produce the same history.
    #[cfg(feature = "parallel")]
    pub fn with_parallel_plan(mut self, enabled: bool) -> Self {
        self.parallel_plan = enabled;
        self
    }

    /// Restores a run from a checkpoint.
    ///
    /// Randomness is derived per (seed, iteration, user), so continuing a
    /// resumed run with the same seed reproduces an uninterrupted one.
    pub fn resume(
        data: &'a DiffusionData,
        protocol: Protocol,
        seed: u64,
        checkpoint: Checkpoint,
    ) -> Result<Self, SimulationError> {
        let mut sim = Self::new(data, protocol, seed)?;
        let Checkpoint {
            summary,
            iterations,
            states,
        } = checkpoint;

        if let Some(summary) = &summary {
            if summary.seed != seed {
                tracing::warn!(
                    "Resuming run {} recorded with seed {} using seed {}",
                    summary.run_id,
                    summary.seed,
                    seed
                );
            }
            sim.clock = summary.clock;
        }
        if states.len() != data.num_users() {
            return Err(SimulationError::InvalidCheckpoint(format!(
                "checkpoint has {} user states but the data has {} users",
                states.len(),
                data.num_users()
            )));
        }
        if let Some((i, state)) = states
            .iter()
            .enumerate()
            .find(|(i, s)| s.user() != UserIdx::new(*i))
        {
            return Err(SimulationError::InvalidCheckpoint(format!(
                "state at position {} belongs to user {}",
                i,
                state.user()
            )));
        }
        if let Some((i, it)) = iterations
            .iter()
            .enumerate()
            .find(|(i, it)| it.number != *i as u64)
        {
            return Err(SimulationError::InvalidCheckpoint(format!(
                "iteration at position {} is numbered {}",
                i, it.number
            )));
        }
        if iterations.is_empty() && states.iter().any(|s| !s.own().is_empty()) {
            return Err(SimulationError::InvalidCheckpoint(
                "user states present without any iteration".to_string(),
            ));
        }

        let total: usize = states.iter().map(|s| s.propagated().len()).sum();
        let recorded = iterations.last().map_or(0, |it| it.total_propagated);
        if total != recorded {
            return Err(SimulationError::InvalidCheckpoint(format!(
                "states hold {} propagations but the history records {}",
                total, recorded
            )));
        }

        sim.propagators = states.iter().map(|s| !s.propagated().is_empty()).collect();
        sim.num_propagators = sim.propagators.iter().filter(|&&p| p).count();
        sim.total_propagated = total;
        sim.states = states;
        sim.history = iterations;

        if let Some(last) = sim.history.last() {
            let counters = sim.counters(last);
            sim.status = if sim.protocol.stop_condition().stop(&counters) {
                SimulationStatus::Stopped
            } else {
                SimulationStatus::Running
            };
            tracing::info!(
                "Resumed simulation at iteration {} ({:?})",
                last.number,
                sim.status
            );
        }
        Ok(sim)
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn is_stopped(&self) -> bool {
        self.status == SimulationStatus::Stopped
    }

    pub fn data(&self) -> &'a DiffusionData {
        self.data
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Iteration history, oldest first.
    pub fn iterations(&self) -> &[Iteration] {
        &self.history
    }

    pub fn states(&self) -> &[UserState] {
        &self.states
    }

    pub fn user_state(&self, user: UserIdx) -> Option<&UserState> {
        self.states.get(user.index())
    }

    pub fn total_propagated(&self) -> usize {
        self.total_propagated
    }

    pub fn propagating_users(&self) -> usize {
        self.num_propagators
    }

    /// Runs one iteration.
    pub fn step(&mut self) -> Result<&Iteration, SimulationError> {
        if self.is_stopped() {
            return Err(SimulationError::AlreadyStopped);
        }
        let idx = self.advance();
        Ok(&self.history[idx])
    }

    /// Runs until the stop condition fires.
    pub fn run(&mut self) -> &[Iteration] {
        while !self.is_stopped() {
            self.advance();
        }
        &self.history
    }

    /// Runs while `keep_going` approves each new iteration.
    ///
    /// Returns the number of iterations executed by this call.
    pub fn run_while(&mut self, mut keep_going: impl FnMut(&Iteration) -> bool) -> usize {
        let mut executed = 0;
        while !self.is_stopped() {
            let idx = self.advance();
            executed += 1;
            if !keep_going(&self.history[idx]) {
                break;
            }
        }
        executed
    }

    /// Snapshot of the run that [`Simulation::resume`] accepts.
    pub fn checkpoint(&self, run_id: impl Into<String>) -> Checkpoint {
        Checkpoint {
            summary: Some(self.summary(run_id)),
            iterations: self.history.clone(),
            states: self.states.clone(),
        }
    }

    pub fn summary(&self, run_id: impl Into<String>) -> RunSummary {
        RunSummary {
            run_id: run_id.into(),
            seed: self.seed,
            clock: self.clock,
            num_users: self.data.num_users(),
            num_pieces: self.data.num_pieces(),
            iterations: self.history.len() as u64,
            total_propagated: self.total_propagated,
            total_propagating_users: self.num_propagators,
            stopped: self.is_stopped(),
        }
    }

    /// Runs one iteration and returns its position in the history.
    fn advance(&mut self) -> usize {
        if self.status == SimulationStatus::NotStarted {
            tracing::info!(
                "Starting simulation: {} users, {} pieces, seed {}, {:?}",
                self.data.num_users(),
                self.data.num_pieces(),
                self.seed,
                self.protocol
            );
            self.status = SimulationStatus::Running;
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }

        let mut record = if self.history.is_empty() {
            self.seed_pieces()
        } else {
            self.diffuse()
        };
        record.total_propagated = self.total_propagated;
        record.total_propagating_users = self.num_propagators;

        let counters = self.counters(&record);
        tracing::debug!(
            "Iteration {}: {} new propagations, {} first seen, {} discarded, {} total",
            record.number,
            record.num_new_propagated,
            counters.new_seen,
            record.num_discarded(),
            record.total_propagated
        );
        let stop = self.protocol.stop_condition().stop(&counters);

        let idx = self.history.len();
        self.history.push(record);
        if stop {
            self.status = SimulationStatus::Stopped;
            tracing::info!(
                "Simulation stopped after {} iterations: {} propagations by {} users",
                self.history.len(),
                self.total_propagated,
                self.num_propagators
            );
        }
        idx
    }

    fn seed_pieces(&mut self) -> Iteration {
        let mut record = Iteration::new(0, self.clock.timestamp_at(0));
        for piece in self.data.pieces() {
            for &creator in self.data.creators(piece) {
                let Some(state) = self.states.get_mut(creator.index()) else {
                    continue;
                };
                if state.add_own(piece) {
                    record.owned.entry(creator).or_default().push(piece);
                }
            }
        }
        record
    }

    fn diffuse(&mut self) -> Iteration {
        let number = self.history.len() as u64;
        let timestamp = self.clock.timestamp_at(number);
        let ctx = MechanismContext::new(self.data, number, timestamp);
        let mut record = Iteration::new(number, timestamp);

        let plans = self.plan(&ctx);
        let deliveries = collect_deliveries(&plans);
        record_contacts(&mut self.states, &plans, number);
        apply_deliveries(
            &mut self.states,
            &deliveries,
            self.protocol.update(),
            number,
            timestamp,
            &mut record,
        );

        let expiration = self.protocol.expiration();
        for state in &mut self.states {
            let user = state.user();
            for piece in expiration.expire(state, &ctx) {
                if state.discard(piece) {
                    record.discarded.entry(user).or_default().push(piece);
                }
            }
        }

        for (&user, pieces) in &record.propagated {
            self.total_propagated += pieces.len();
            if let Some(flag) = self.propagators.get_mut(user.index()) {
                if !*flag {
                    *flag = true;
                    self.num_propagators += 1;
                }
            }
        }
        record
    }

    #[cfg(not(feature = "parallel"))]
    fn plan(&self, ctx: &MechanismContext<'_>) -> Vec<Plan> {
        self.plan_sequential(ctx)
    }

    #[cfg(feature = "parallel")]
    fn plan(&self, ctx: &MechanismContext<'_>) -> Vec<Plan> {
        use rayon::prelude::*;
        if !self.parallel_plan {
            return self.plan_sequential(ctx);
        }
        (0..self.states.len())
            .into_par_iter()
            .map(|i| self.plan_user(UserIdx::new(i), ctx))
            .collect()
    }

    fn plan_sequential(&self, ctx: &MechanismContext<'_>) -> Vec<Plan> {
        self.data.users().map(|user| self.plan_user(user, ctx)).collect()
    }

    fn plan_user(&self, user: UserIdx, ctx: &MechanismContext<'_>) -> Plan {
        let state = &self.states[user.index()];
        let mut rng = user_rng(self.seed, ctx.iteration, user);
        let mut selected = if state.has_pending() {
            self.protocol.selection().select(user, ctx, state, &mut rng)
        } else {
            Vec::new()
        };
        let mut offered = std::collections::BTreeSet::new();
        selected.retain(|&p| state.can_propagate(p) && offered.insert(p));
        let contacts = self
            .protocol
            .propagation()
            .contacts(user, ctx, state, !selected.is_empty(), &mut rng);
        Plan {
            user,
            selected,
            contacts,
        }
    }

    fn counters(&self, record: &Iteration) -> StopCounters {
        StopCounters {
            iteration: record.number,
            timestamp: record.timestamp,
            new_propagated: record.num_new_propagated,
            new_seen: record.num_first_seen(),
            total_propagated: record.total_propagated,
            propagating_users: record.total_propagating_users,
            elapsed: self.started.map(|s| s.elapsed()).unwrap_or_default(),
        }
    }
}
