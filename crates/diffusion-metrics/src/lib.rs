//! Metrics over recorded diffusion runs.
//!
//! Everything here is a read-only consumer: it takes the data a run was
//! built from plus the run's checkpoint and never drives the engine.
//!
//! ```text
//! ┌────────────────┐   iterations.jsonl    ┌───────────────────┐   metrics.json
//! │ diffusion_sim  │ ──────────────────▶   │ diffusion_metrics │ ─────────────▶
//! └────────────────┘   states.json         └───────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`diffusion`]: Spread curve, coverage, reach and Gini inequality
//! - [`recall`]: Recall and precision against ground-truth propagation
//! - [`structural`]: Reciprocity, clustering and overlay probes
//! - [`report`]: The aggregated [`MetricsReport`]

pub mod config;
pub mod diffusion;
pub mod error;
pub mod recall;
pub mod report;
pub mod structural;

pub use config::{default_metrics_toml, MetricsConfig, ProbeConfig};
pub use diffusion::{
    coverage, first_propagation, gini, piece_reach, piece_reach_gini, spread_curve,
    user_propagation_gini, SpreadPoint,
};
pub use error::MetricsError;
pub use recall::RealPropagationRecall;
pub use report::{MetricsReport, ProbeReport, RecallReport, StructureReport};
pub use structural::{average_clustering, clustering_gain, local_clustering, reciprocity, ClusteringProbe};
