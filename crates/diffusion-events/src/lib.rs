//! Shared record types for the diffusion simulation.
//!
//! This crate contains pure data structures with no simulation logic: dense
//! user/piece indices, the per-step [`Iteration`] record, the simulation
//! [`Clock`] and the run summary written next to a checkpoint. Everything
//! here is plain, immutable, serializable data so that checkpoints and
//! metrics can be produced and consumed independently of the engine.

pub mod clock;
pub mod ids;
pub mod iteration;
pub mod summary;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use clock::{Clock, ParseClockError};
pub use ids::{PieceIdx, UserIdx};
pub use iteration::{Iteration, SeenPiece};
pub use summary::{generate_run_id, RunSummary};
