//! Metrics configuration.
//!
//! Read from the optional `[metrics]` section of the run file, so one file
//! describes both the simulation and its evaluation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::MetricsError;

/// What to include in a [`MetricsReport`](crate::MetricsReport).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Per-iteration spread points.
    pub spread_curve: bool,
    /// Per-iteration recall against the ground truth.
    pub recall_curve: bool,
    /// Reciprocity and clustering of the network.
    pub structural: bool,
    /// Hypothetical ties whose clustering gain is reported.
    pub probes: Vec<ProbeConfig>,
    /// Report file name inside the run directory.
    pub report_file: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            spread_curve: true,
            recall_curve: false,
            structural: true,
            probes: Vec::new(),
            report_file: "metrics.json".to_string(),
        }
    }
}

/// A hypothetical `origin -> dest` tie, by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub origin: String,
    pub dest: String,
}

#[derive(Debug, Default, Deserialize)]
struct RunFile {
    #[serde(default)]
    metrics: MetricsConfig,
}

impl MetricsConfig {
    /// Reads the `[metrics]` section of a run file; defaults if absent.
    pub fn from_run_file(path: &Path) -> Result<Self, MetricsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_run_str(&content)
    }

    pub fn from_run_str(content: &str) -> Result<Self, MetricsError> {
        let file: RunFile = toml::from_str(content)?;
        Ok(file.metrics)
    }
}

/// Section appended to a run file by `diffusion_metrics --print-default-config`.
pub fn default_metrics_toml() -> String {
    r#"[metrics]
spread_curve = true
recall_curve = false
structural = true
report_file = "metrics.json"

# [[metrics.probes]]
# origin = "alice"
# dest = "bob"
"#
    .to_string()
}
