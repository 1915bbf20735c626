//! Simulation checkpoints.
//!
//! # Files
//!
//! - `iterations.jsonl` - one [`Iteration`] per line, appended as the run
//!   progresses
//! - `states.json` - the list of [`UserState`]s after the last iteration
//! - `summary.json` - a [`RunSummary`] describing the run
//!
//! A directory holding all three can be read back into a [`Checkpoint`]
//! and handed to [`Simulation::resume`](crate::Simulation::resume).

use diffusion_events::{Iteration, RunSummary};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::CheckpointError;
use crate::state::UserState;

pub const ITERATIONS_FILE: &str = "iterations.jsonl";
pub const STATES_FILE: &str = "states.json";
pub const SUMMARY_FILE: &str = "summary.json";

/// Everything needed to resume or evaluate a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub summary: Option<RunSummary>,
    pub iterations: Vec<Iteration>,
    pub states: Vec<UserState>,
}

/// Streams a run to a checkpoint directory.
#[derive(Debug)]
pub struct SimulationWriter {
    output_dir: PathBuf,
    iterations_writer: BufWriter<File>,
    iterations_written: u64,
}

impl SimulationWriter {
    /// Creates the directory if needed and truncates the iteration log.
    pub fn new(output_dir: &Path) -> Result<Self, CheckpointError> {
        fs::create_dir_all(output_dir)?;
        let file = File::create(output_dir.join(ITERATIONS_FILE))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            iterations_writer: BufWriter::new(file),
            iterations_written: 0,
        })
    }

    /// Appends one iteration as a JSON line.
    pub fn write_iteration(&mut self, iteration: &Iteration) -> Result<(), CheckpointError> {
        let line = iteration.to_jsonl()?;
        writeln!(self.iterations_writer, "{}", line)?;
        self.iterations_written += 1;
        Ok(())
    }

    pub fn write_iterations(&mut self, iterations: &[Iteration]) -> Result<(), CheckpointError> {
        for iteration in iterations {
            self.write_iteration(iteration)?;
        }
        Ok(())
    }

    /// Overwrites the state snapshot.
    pub fn write_states(&self, states: &[UserState]) -> Result<(), CheckpointError> {
        let file = File::create(self.output_dir.join(STATES_FILE))?;
        serde_json::to_writer(BufWriter::new(file), states)?;
        Ok(())
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<(), CheckpointError> {
        let file = File::create(self.output_dir.join(SUMMARY_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
        Ok(())
    }

    /// Writes states and summary, then flushes the iteration log.
    pub fn write_checkpoint(&mut self, states: &[UserState], summary: &RunSummary) -> Result<(), CheckpointError> {
        self.flush()?;
        self.write_states(states)?;
        self.write_summary(summary)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CheckpointError> {
        self.iterations_writer.flush()?;
        Ok(())
    }

    pub fn iterations_written(&self) -> u64 {
        self.iterations_written
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Reads a checkpoint directory.
#[derive(Debug)]
pub struct SimulationReader {
    dir: PathBuf,
}

impl SimulationReader {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Reads every iteration, skipping blank lines.
    pub fn read_iterations(&self) -> Result<Vec<Iteration>, CheckpointError> {
        let reader = BufReader::new(File::open(self.dir.join(ITERATIONS_FILE))?);
        let mut iterations = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                iterations.push(Iteration::from_jsonl(&line)?);
            }
        }
        Ok(iterations)
    }

    /// Reads one iteration by position (0 is the seeding step).
    pub fn read_iteration(&self, index: usize) -> Result<Option<Iteration>, CheckpointError> {
        let reader = BufReader::new(File::open(self.dir.join(ITERATIONS_FILE))?);
        let line = reader
            .lines()
            .filter(|l| l.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .nth(index);
        match line {
            Some(line) => Ok(Some(Iteration::from_jsonl(&line?)?)),
            None => Ok(None),
        }
    }

    pub fn read_states(&self) -> Result<Vec<UserState>, CheckpointError> {
        let reader = BufReader::new(File::open(self.dir.join(STATES_FILE))?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads the summary if one was written.
    pub fn read_summary(&self) -> Result<Option<RunSummary>, CheckpointError> {
        let path = self.dir.join(SUMMARY_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn read_checkpoint(&self) -> Result<Checkpoint, CheckpointError> {
        let checkpoint = Checkpoint {
            summary: self.read_summary()?,
            iterations: self.read_iterations()?,
            states: self.read_states()?,
        };
        tracing::info!(
            "Loaded checkpoint from {:?}: {} iterations, {} users",
            self.dir,
            checkpoint.iterations.len(),
            checkpoint.states.len()
        );
        Ok(checkpoint)
    }
}
