//! Metrics Report
//!
//! Aggregates every metric of a recorded run into one serializable value,
//! written as pretty JSON next to the checkpoint.

use diffusion_core::{Checkpoint, DiffusionData};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::config::MetricsConfig;
use crate::diffusion::{
    coverage, piece_reach, piece_reach_gini, spread_curve, user_propagation_gini, SpreadPoint,
};
use crate::error::MetricsError;
use crate::recall::RealPropagationRecall;
use crate::structural::{average_clustering, clustering_gain, reciprocity, ClusteringProbe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallReport {
    pub score: RealPropagationRecall,
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
    /// Cumulative recall after each iteration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curve: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub origin: String,
    pub dest: String,
    pub gain: f64,
    pub probe: ClusteringProbe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub reciprocity: f64,
    pub average_clustering: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeReport>,
}

/// Everything measured about one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub num_users: usize,
    pub num_pieces: usize,
    pub iterations: usize,
    pub total_propagated: usize,
    pub propagating_users: usize,
    pub coverage: f64,
    pub user_propagation_gini: f64,
    pub piece_reach: Vec<usize>,
    pub mean_piece_reach: f64,
    pub piece_reach_gini: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spread: Vec<SpreadPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<RecallReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureReport>,
}

impl MetricsReport {
    /// Computes the report of a checkpoint over the data it was run on.
    pub fn compute(
        data: &DiffusionData,
        checkpoint: &Checkpoint,
        config: &MetricsConfig,
    ) -> Result<Self, MetricsError> {
        check_matches(data, checkpoint)?;
        let history = &checkpoint.iterations;
        let states = &checkpoint.states;

        let reach = piece_reach(history, data.num_pieces());
        let mean_piece_reach = if reach.is_empty() {
            0.0
        } else {
            reach.iter().sum::<usize>() as f64 / reach.len() as f64
        };
        let last = history.last();

        let recall = RealPropagationRecall::compute(data, states).map(|score| {
            let curve = if config.recall_curve {
                RealPropagationRecall::curve(data, history)
                    .map(|c| c.iter().map(RealPropagationRecall::recall).collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            RecallReport {
                recall: score.recall(),
                precision: score.precision(),
                f1: score.f1(),
                score,
                curve,
            }
        });

        let structure = config.structural.then(|| structure_report(data, config));

        Ok(Self {
            run_id: checkpoint.summary.as_ref().map(|s| s.run_id.clone()),
            num_users: data.num_users(),
            num_pieces: data.num_pieces(),
            iterations: history.len(),
            total_propagated: last.map_or(0, |it| it.total_propagated),
            propagating_users: last.map_or(0, |it| it.total_propagating_users),
            coverage: coverage(states),
            user_propagation_gini: user_propagation_gini(states),
            mean_piece_reach,
            piece_reach_gini: piece_reach_gini(&reach),
            piece_reach: reach,
            spread: if config.spread_curve {
                spread_curve(history)
            } else {
                Vec::new()
            },
            recall,
            structure,
        })
    }

    pub fn to_json(&self) -> Result<String, MetricsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), MetricsError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self, MetricsError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

fn check_matches(data: &DiffusionData, checkpoint: &Checkpoint) -> Result<(), MetricsError> {
    if checkpoint.states.len() != data.num_users() {
        return Err(MetricsError::Mismatch(format!(
            "{} user states for {} users",
            checkpoint.states.len(),
            data.num_users()
        )));
    }
    if let Some(summary) = &checkpoint.summary {
        if summary.num_pieces != data.num_pieces() {
            return Err(MetricsError::Mismatch(format!(
                "run {} has {} pieces, data has {}",
                summary.run_id,
                summary.num_pieces,
                data.num_pieces()
            )));
        }
    }
    Ok(())
}

fn structure_report(data: &DiffusionData, config: &MetricsConfig) -> StructureReport {
    let graph = data.graph();
    let probes = config
        .probes
        .iter()
        .filter_map(|p| {
            let (Some(origin), Some(dest)) = (data.user_index(&p.origin), data.user_index(&p.dest)) else {
                tracing::warn!("Probe {} -> {} names unknown users, skipped", p.origin, p.dest);
                return None;
            };
            let probe = clustering_gain(graph, origin.index(), dest.index());
            Some(ProbeReport {
                origin: p.origin.clone(),
                dest: p.dest.clone(),
                gain: probe.gain(),
                probe,
            })
        })
        .collect();
    StructureReport {
        reciprocity: reciprocity(graph),
        average_clustering: average_clustering(graph),
        probes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use diffusion_core::UserState;
    use diffusion_events::fixtures::sample_iterations;
    use diffusion_events::UserIdx;
    use socnet_graph::Graph;

    /// Matches the fixture history: chain u0 -> u1 -> u2 and isolated u3.
    fn data() -> DiffusionData {
        let mut graph = Graph::directed();
        for i in 0..4 {
            graph.add_node(format!("u{}", i));
        }
        graph.add_default_edge(&"u0".to_string(), &"u1".to_string());
        graph.add_default_edge(&"u1".to_string(), &"u2".to_string());
        let mut builder = DiffusionData::builder(graph);
        builder.add_piece("p0", "u0", 0).add_piece("p1", "u3", 0);
        builder.build()
    }

    fn checkpoint() -> Checkpoint {
        Checkpoint {
            summary: None,
            iterations: sample_iterations(),
            states: (0..4).map(|i| UserState::new(UserIdx(i))).collect(),
        }
    }

    #[test]
    fn test_compute_report() {
        let report = MetricsReport::compute(&data(), &checkpoint(), &MetricsConfig::default()).unwrap();
        assert_eq!(report.iterations, 4);
        assert_eq!(report.total_propagated, 2);
        assert_eq!(report.piece_reach, vec![2, 0]);
        assert_eq!(report.mean_piece_reach, 1.0);
        assert_eq!(report.spread.len(), 4);
        assert!(report.recall.is_none());
        let structure = report.structure.unwrap();
        assert_eq!(structure.reciprocity, 0.0);
    }

    #[test]
    fn test_optional_sections() {
        let config = MetricsConfig {
            spread_curve: false,
            structural: false,
            ..MetricsConfig::default()
        };
        let report = MetricsReport::compute(&data(), &checkpoint(), &config).unwrap();
        assert!(report.spread.is_empty());
        assert!(report.structure.is_none());
        let json = report.to_json().unwrap();
        assert!(!json.contains("spread"));
    }

    #[test]
    fn test_probes() {
        let config = MetricsConfig {
            probes: vec![
                ProbeConfig {
                    origin: "u0".to_string(),
                    dest: "u2".to_string(),
                },
                ProbeConfig {
                    origin: "u0".to_string(),
                    dest: "nobody".to_string(),
                },
            ],
            ..MetricsConfig::default()
        };
        let report = MetricsReport::compute(&data(), &checkpoint(), &config).unwrap();
        let probes = report.structure.unwrap().probes;
        assert_eq!(probes.len(), 1);
        assert!(probes[0].probe.added);
        assert!(probes[0].gain > 0.0);
    }

    #[test]
    fn test_mismatched_checkpoint() {
        let mut checkpoint = checkpoint();
        checkpoint.states.pop();
        let err = MetricsReport::compute(&data(), &checkpoint, &MetricsConfig::default()).unwrap_err();
        assert!(matches!(err, MetricsError::Mismatch(_)));
    }
}
