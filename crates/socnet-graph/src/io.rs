//! Graph Readers
//!
//! Tab-separated edge lists (`origin \t destination [\t weight [\t type]]`)
//! and newline-delimited index files. Blank lines and lines starting with
//! `#` are skipped.

use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::edge::{DEFAULT_TYPE, DEFAULT_WEIGHT};
use crate::error::GraphError;
use crate::graph::{Graph, GraphConfig};
use crate::index::Index;

fn parse_field<T: FromStr>(field: &str, line: usize, what: &str) -> Result<T, GraphError> {
    field.trim().parse().map_err(|_| GraphError::Parse {
        line,
        message: format!("invalid {}: '{}'", what, field),
    })
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Reads edges into an existing graph, returning how many were added.
///
/// With `auto_create_nodes` false, edges touching unknown nodes are skipped.
/// Duplicate edges in a simple graph are skipped as well.
pub fn read_edges_into<U, R>(
    graph: &mut Graph<U>,
    reader: R,
    auto_create_nodes: bool,
) -> Result<usize, GraphError>
where
    U: FromStr + Clone + Eq + Hash,
    R: BufRead,
{
    let mut added = 0;
    let mut skipped = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if is_skippable(&line) {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            return Err(GraphError::Parse {
                line: line_no,
                message: "expected at least origin and destination".to_string(),
            });
        }
        let origin: U = parse_field(fields[0], line_no, "origin")?;
        let dest: U = parse_field(fields[1], line_no, "destination")?;
        let weight = match fields.get(2) {
            Some(f) => parse_field(f, line_no, "weight")?,
            None => DEFAULT_WEIGHT,
        };
        let kind = match fields.get(3) {
            Some(f) => parse_field(f, line_no, "type")?,
            None => DEFAULT_TYPE,
        };
        if graph.add_edge(&origin, &dest, weight, kind, auto_create_nodes) {
            added += 1;
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        tracing::debug!("Skipped {} duplicate or dangling edges", skipped);
    }
    Ok(added)
}

/// Reads an edge list into a new graph, creating nodes as they appear.
pub fn read_edge_list<U, R>(reader: R, config: GraphConfig) -> Result<Graph<U>, GraphError>
where
    U: FromStr + Clone + Eq + Hash,
    R: BufRead,
{
    let mut graph = Graph::new(config);
    read_edges_into(&mut graph, reader, true)?;
    Ok(graph)
}

/// Reads an edge list file.
///
/// When `nodes` is given, the graph is seeded with those nodes first (so
/// isolated users keep their index) and edges to unknown nodes are skipped.
pub fn read_edge_list_file<U>(
    path: &Path,
    config: GraphConfig,
    nodes: Option<&Index<U>>,
) -> Result<Graph<U>, GraphError>
where
    U: FromStr + Clone + Eq + Hash,
{
    let reader = BufReader::new(File::open(path)?);
    let mut graph = Graph::new(config);
    let auto_create = match nodes {
        Some(index) => {
            for node in index.iter() {
                graph.add_node(node.clone());
            }
            false
        }
        None => true,
    };
    let added = read_edges_into(&mut graph, reader, auto_create)?;
    tracing::info!(
        "Loaded graph from {:?}: {} nodes, {} edges",
        path,
        graph.num_nodes(),
        added
    );
    Ok(graph)
}

/// Reads a newline-delimited index (one identifier per line).
pub fn read_index<U, R>(reader: R) -> Result<Index<U>, GraphError>
where
    U: FromStr + Clone + Eq + Hash,
    R: BufRead,
{
    let mut index = Index::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        let item: U = parse_field(&line, i + 1, "identifier")?;
        index.insert(item);
    }
    Ok(index)
}

/// Reads an index file.
pub fn read_index_file<U>(path: &Path) -> Result<Index<U>, GraphError>
where
    U: FromStr + Clone + Eq + Hash,
{
    read_index(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_edge_list_with_optional_columns() {
        let data = "# comment\na\tb\nb\tc\t2.5\nc\ta\t1.0\t7\n\n";
        let graph: Graph<String> = read_edge_list(Cursor::new(data), GraphConfig::default()).unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_edges(), 3);
        let (b, c, a) = ("b".to_string(), "c".to_string(), "a".to_string());
        assert_eq!(graph.edge_weight(&b, &c), 2.5);
        assert_eq!(graph.edge_type(&c, &a), 7);
        assert_eq!(graph.edge_type(&a, &b), DEFAULT_TYPE);
    }

    #[test]
    fn test_read_edge_list_reports_bad_line() {
        let data = "1\t2\n3\n";
        let result: Result<Graph<u32>, _> = read_edge_list(Cursor::new(data), GraphConfig::default());
        match result {
            Err(GraphError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other.map(|g| g.num_edges())),
        }
    }

    #[test]
    fn test_read_edges_into_skips_unknown_nodes() {
        let mut graph: Graph<u32> = Graph::directed();
        graph.add_node(1);
        graph.add_node(2);
        let added = read_edges_into(&mut graph, Cursor::new("1\t2\n2\t3\n1\t2\n"), false).unwrap();
        assert_eq!(added, 1);
        assert_eq!(graph.num_nodes(), 2);
    }

    #[test]
    fn test_read_index() {
        let index: Index<u64> = read_index(Cursor::new("10\n20\n\n10\n")).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.index_of(&20), Some(1));
    }

    #[test]
    fn test_read_edge_list_file_with_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.tsv");
        std::fs::write(&path, "b\ta\n").unwrap();
        let nodes = Index::from_items(vec!["a".to_string(), "b".to_string(), "z".to_string()]);
        let graph = read_edge_list_file(&path, GraphConfig::default(), Some(&nodes)).unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.node_index(&"b".to_string()), Some(1));
        assert!(graph.contains_edge(&"b".to_string(), &"a".to_string()));
    }
}
