//! Input Loaders
//!
//! Tab-separated readers for the files a run is built from. Blank lines
//! and `#` comments are ignored, lines with too few fields are skipped with
//! a warning, and numeric fields that fail to parse are errors.

use diffusion_events::UserIdx;
use socnet_graph::io::{read_edge_list_file, read_index_file};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::config::DataConfig;
use crate::data::{DiffusionData, DiffusionDataBuilder, UserId};
use crate::error::LoadError;

/// Which entity a feature table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureTarget {
    Users,
    Pieces,
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Splits a line into at least `min` trimmed fields, or `None`.
fn fields(line: &str, min: usize) -> Option<Vec<&str>> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < min || fields[..min].iter().any(|f| f.is_empty()) {
        None
    } else {
        Some(fields)
    }
}

fn parse<T: FromStr>(field: &str, line: usize, what: &str) -> Result<T, LoadError> {
    field.parse().map_err(|_| LoadError::Parse {
        line,
        message: format!("invalid {}: '{}'", what, field),
    })
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    Ok(BufReader::new(File::open(path)?))
}

/// Reads `piece \t creator \t timestamp` lines after a header line.
///
/// A piece with several creators appears once per creator. Returns the
/// number of lines accepted.
pub fn read_pieces<R: BufRead>(builder: &mut DiffusionDataBuilder, reader: R) -> Result<usize, LoadError> {
    let mut accepted = 0;
    let mut header_seen = false;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }
        let Some(f) = fields(&line, 3) else {
            tracing::warn!("Skipping malformed piece line {}: '{}'", i + 1, line);
            continue;
        };
        let timestamp: i64 = parse(f[2], i + 1, "timestamp")?;
        builder.add_piece(f[0], f[1], timestamp);
        accepted += 1;
    }
    Ok(accepted)
}

/// Reads `entity \t value [\t weight]` lines into the named feature.
///
/// The weight defaults to 1.
pub fn read_features<R: BufRead>(
    builder: &mut DiffusionDataBuilder,
    target: FeatureTarget,
    name: &str,
    reader: R,
) -> Result<usize, LoadError> {
    let mut accepted = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        let Some(f) = fields(&line, 2) else {
            tracing::warn!("Skipping malformed feature line {} of {}: '{}'", i + 1, name, line);
            continue;
        };
        let weight = match f.get(2).filter(|w| !w.is_empty()) {
            Some(w) => parse(w, i + 1, "weight")?,
            None => 1.0,
        };
        match target {
            FeatureTarget::Users => builder.add_user_feature(name, f[0], f[1], weight),
            FeatureTarget::Pieces => builder.add_piece_feature(name, f[0], f[1], weight),
        };
        accepted += 1;
    }
    Ok(accepted)
}

/// Reads `user \t piece \t timestamp` ground-truth lines.
///
/// The data is marked as having ground truth even if the file is empty.
pub fn read_real_propagation<R: BufRead>(builder: &mut DiffusionDataBuilder, reader: R) -> Result<usize, LoadError> {
    builder.with_empty_real_propagation();
    let mut accepted = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        let Some(f) = fields(&line, 3) else {
            tracing::warn!("Skipping malformed ground truth line {}: '{}'", i + 1, line);
            continue;
        };
        let timestamp: i64 = parse(f[2], i + 1, "timestamp")?;
        builder.add_real_propagation(f[0], f[1], timestamp);
        accepted += 1;
    }
    Ok(accepted)
}

/// Reads `user \t recommended` lines into per-user lists.
///
/// Lists keep file order without duplicates. Unknown users and
/// self-recommendations are skipped.
pub fn read_recommendations<R: BufRead>(
    data: &DiffusionData,
    reader: R,
) -> Result<HashMap<UserIdx, Vec<UserIdx>>, LoadError> {
    let mut recommendations: HashMap<UserIdx, Vec<UserIdx>> = HashMap::new();
    let mut skipped = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        let Some(f) = fields(&line, 2) else {
            tracing::warn!("Skipping malformed recommendation line {}: '{}'", i + 1, line);
            continue;
        };
        match (data.user_index(f[0]), data.user_index(f[1])) {
            (Some(user), Some(rec)) if user != rec => {
                let list = recommendations.entry(user).or_default();
                if !list.contains(&rec) {
                    list.push(rec);
                }
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!("Skipped {} recommendations with unknown or identical users", skipped);
    }
    Ok(recommendations)
}

pub fn read_recommendations_file(
    data: &DiffusionData,
    path: &Path,
) -> Result<HashMap<UserIdx, Vec<UserIdx>>, LoadError> {
    let recommendations = read_recommendations(data, open(path)?)?;
    tracing::info!(
        "Loaded recommendations from {:?} for {} users",
        path,
        recommendations.len()
    );
    Ok(recommendations)
}

/// Loads the graph and every input named by the data section.
pub fn load_data(config: &DataConfig) -> Result<DiffusionData, LoadError> {
    let users = match &config.users {
        Some(path) => Some(read_index_file::<UserId>(path)?),
        None => None,
    };
    let graph = read_edge_list_file::<UserId>(&config.edges, config.graph, users.as_ref())?;
    let mut builder = DiffusionData::builder(graph);

    let pieces = read_pieces(&mut builder, open(&config.pieces)?)?;
    tracing::info!("Loaded {} piece records from {:?}", pieces, config.pieces);

    for feature in &config.user_features {
        let n = read_features(&mut builder, FeatureTarget::Users, &feature.name, open(&feature.path)?)?;
        tracing::info!("Loaded {} user feature records for {}", n, feature.name);
    }
    for feature in &config.piece_features {
        let n = read_features(&mut builder, FeatureTarget::Pieces, &feature.name, open(&feature.path)?)?;
        tracing::info!("Loaded {} piece feature records for {}", n, feature.name);
    }
    if let Some(path) = &config.real_propagation {
        let n = read_real_propagation(&mut builder, open(path)?)?;
        tracing::info!("Loaded {} ground truth records from {:?}", n, path);
    }

    let data = builder.build();
    tracing::info!("Diffusion data ready: {} users, {} pieces", data.num_users(), data.num_pieces());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureFile;
    use diffusion_events::PieceIdx;
    use socnet_graph::{Graph, GraphConfig};
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn graph() -> Graph<UserId> {
        let mut graph = Graph::directed();
        for id in ["a", "b", "c"] {
            graph.add_node(id.to_string());
        }
        graph
    }

    #[test]
    fn test_read_pieces_skips_header_and_malformed_lines() {
        let mut builder = DiffusionData::builder(graph());
        let input = "piece\tcreator\ttimestamp\np1\ta\t10\nbroken line\np1\tb\t12\n\np2\tc\t20\n";
        let n = read_pieces(&mut builder, Cursor::new(input)).unwrap();
        assert_eq!(n, 3);
        let data = builder.build();
        assert_eq!(data.num_pieces(), 2);
        let p1 = data.piece_index("p1").unwrap();
        assert_eq!(data.creators(p1).len(), 2);
        assert_eq!(data.piece(p1).unwrap().timestamp, 10);
    }

    #[test]
    fn test_read_pieces_rejects_bad_timestamp() {
        let mut builder = DiffusionData::builder(graph());
        let input = "header\np1\ta\tsoon\n";
        let err = read_pieces(&mut builder, Cursor::new(input)).unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_read_features_default_weight() {
        let mut builder = DiffusionData::builder(graph());
        builder.add_piece("p1", "a", 0);
        read_features(&mut builder, FeatureTarget::Pieces, "topic", Cursor::new("p1\tsports\np1\tnews\t0.5\n")).unwrap();
        read_features(&mut builder, FeatureTarget::Users, "topic", Cursor::new("b\tsports\t2\n")).unwrap();
        let data = builder.build();
        let p1 = data.piece_index("p1").unwrap();
        let mut values = data.piece_features(p1, "topic");
        values.sort_by(|a, b| a.0.cmp(b.0));
        assert_eq!(values, vec![("news", 0.5), ("sports", 1.0)]);
        let b = data.user_index("b").unwrap();
        assert_eq!(data.user_features(b, "topic"), vec![("sports", 2.0)]);
    }

    #[test]
    fn test_read_real_propagation() {
        let mut builder = DiffusionData::builder(graph());
        builder.add_piece("p1", "a", 0);
        read_real_propagation(&mut builder, Cursor::new("b\tp1\t7\nzz\tp1\t3\n")).unwrap();
        let data = builder.build();
        let b = data.user_index("b").unwrap();
        assert!(data.has_real_propagation());
        assert_eq!(data.real_propagated_timestamp(b, PieceIdx(0)), Some(7));
        assert_eq!(data.real_propagation().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_ground_truth_still_counts() {
        let mut builder = DiffusionData::builder(graph());
        read_real_propagation(&mut builder, Cursor::new("")).unwrap();
        assert!(builder.build().has_real_propagation());
    }

    #[test]
    fn test_read_recommendations() {
        let data = DiffusionData::builder(graph()).build();
        let input = "a\tb\na\tc\na\tb\na\ta\nb\tunknown\nc\ta\n";
        let recs = read_recommendations(&data, Cursor::new(input)).unwrap();
        let a = data.user_index("a").unwrap();
        let b = data.user_index("b").unwrap();
        let c = data.user_index("c").unwrap();
        assert_eq!(recs[&a], vec![b, c]);
        assert_eq!(recs[&c], vec![a]);
        assert!(!recs.contains_key(&b));
    }

    #[test]
    fn test_load_data_from_files() {
        let dir = tempdir().unwrap();
        let path = |name: &str| dir.path().join(name);
        fs::write(path("users.txt"), "a\nb\nc\nlonely\n").unwrap();
        fs::write(path("edges.tsv"), "a\tb\nb\tc\nc\tstranger\n").unwrap();
        fs::write(path("pieces.tsv"), "piece\tcreator\ttimestamp\np1\ta\t0\np2\tb\t5\n").unwrap();
        fs::write(path("truth.tsv"), "b\tp1\t3\n").unwrap();
        fs::write(path("topics.tsv"), "p1\tsports\n").unwrap();

        let config = DataConfig {
            edges: path("edges.tsv"),
            graph: GraphConfig::default(),
            users: Some(path("users.txt")),
            pieces: path("pieces.tsv"),
            real_propagation: Some(path("truth.tsv")),
            user_features: Vec::new(),
            piece_features: vec![FeatureFile {
                name: "topic".to_string(),
                path: path("topics.tsv"),
            }],
        };
        let data = load_data(&config).unwrap();
        // the index fixes the population, so the dangling edge is dropped
        assert_eq!(data.num_users(), 4);
        assert_eq!(data.graph().num_edges(), 2);
        assert_eq!(data.num_pieces(), 2);
        assert!(data.has_real_propagation());
        assert_eq!(data.num_feature_values("topic"), 1);
    }

    #[test]
    fn test_load_data_missing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("edges.tsv"), "a\tb\n").unwrap();
        let config = DataConfig {
            edges: dir.path().join("edges.tsv"),
            graph: GraphConfig::default(),
            users: None,
            pieces: dir.path().join("missing.tsv"),
            real_propagation: None,
            user_features: Vec::new(),
            piece_features: Vec::new(),
        };
        assert!(matches!(load_data(&config), Err(LoadError::Io(_))));
    }
}
