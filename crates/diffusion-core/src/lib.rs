//! Information diffusion engine.
//!
//! Users of a social network hold information pieces and pass them along
//! their ties in discrete iterations. A [`Protocol`] decides what each user
//! offers (selection), whom they exchange with (propagation), how repeated
//! receptions merge (update), when held pieces are forgotten (expiration)
//! and when the run ends (stop condition).
//!
//! # Modules
//!
//! - [`data`]: Immutable [`DiffusionData`] (graph, pieces, features, ground truth)
//! - [`state`]: Per-user [`UserState`]
//! - [`mechanisms`]: Mechanism traits and their implementations
//! - [`simulation`]: The iteration driver
//! - [`config`] / [`loader`]: TOML run files and tab-separated inputs
//! - [`checkpoint`]: JSONL iteration logs and resumable snapshots

pub mod checkpoint;
pub mod commit;
pub mod config;
pub mod data;
pub mod error;
pub mod loader;
pub mod mechanisms;
pub mod protocol;
pub mod rng;
pub mod simulation;
pub mod state;

pub use checkpoint::{Checkpoint, SimulationReader, SimulationWriter};
pub use config::{ProtocolConfig, RunConfig};
pub use data::{DiffusionData, DiffusionDataBuilder, InformationPiece, PieceId, UserId};
pub use error::{CheckpointError, ConfigError, LoadError, SimulationError};
pub use loader::load_data;
pub use mechanisms::{Limit, MechanismContext, StopCounters};
pub use protocol::{Protocol, ProtocolBuilder};
pub use simulation::{Simulation, SimulationStatus};
pub use state::{ReceivedInfo, UserState};
