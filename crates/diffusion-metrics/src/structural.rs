//! Structural Metrics
//!
//! Computed over any [`GraphView`], so the same code scores the base graph
//! and a [`GraphOverlay`] probing one hypothetical tie.

use serde::{Deserialize, Serialize};
use socnet_graph::{GraphOverlay, GraphView, Orientation};

/// Share of directed edges whose reverse edge also exists.
///
/// Undirected graphs with edges are fully reciprocal; graphs without edges
/// score 0.
pub fn reciprocity<G: GraphView>(graph: &G) -> f64 {
    let mut edges = 0usize;
    let mut reciprocal = 0usize;
    for node in 0..graph.num_nodes() {
        for dest in graph.neighbours(node, Orientation::Out) {
            if dest == node {
                continue;
            }
            edges += 1;
            if graph.has_edge(dest, node) {
                reciprocal += 1;
            }
        }
    }
    if edges == 0 {
        0.0
    } else {
        reciprocal as f64 / edges as f64
    }
}

/// Fraction of neighbour pairs that are themselves tied, ignoring
/// direction. Nodes with fewer than two neighbours score 0.
pub fn local_clustering<G: GraphView>(graph: &G, node: usize) -> f64 {
    let neighbours: Vec<usize> = graph
        .neighbours(node, Orientation::Und)
        .into_iter()
        .filter(|&n| n != node)
        .collect();
    let k = neighbours.len();
    if k < 2 {
        return 0.0;
    }
    let mut linked = 0usize;
    for (i, &a) in neighbours.iter().enumerate() {
        for &b in &neighbours[i + 1..] {
            if graph.has_edge(a, b) || graph.has_edge(b, a) {
                linked += 1;
            }
        }
    }
    linked as f64 / (k * (k - 1) / 2) as f64
}

/// Mean local clustering over all nodes.
pub fn average_clustering<G: GraphView>(graph: &G) -> f64 {
    let n = graph.num_nodes();
    if n == 0 {
        return 0.0;
    }
    (0..n).map(|v| local_clustering(graph, v)).sum::<f64>() / n as f64
}

/// Outcome of probing one hypothetical edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringProbe {
    pub origin: usize,
    pub dest: usize,
    /// False when the edge already existed or an endpoint is unknown.
    pub added: bool,
    pub before: f64,
    pub after: f64,
}

impl ClusteringProbe {
    pub fn gain(&self) -> f64 {
        self.after - self.before
    }
}

/// Change in average clustering if `origin -> dest` were added.
///
/// The base graph is only borrowed; the edge lives in an overlay.
pub fn clustering_gain<G: GraphView>(graph: &G, origin: usize, dest: usize) -> ClusteringProbe {
    let before = average_clustering(graph);
    let mut overlay = GraphOverlay::new(graph);
    let added = origin != dest && overlay.add_edge(origin, dest);
    let after = if added { average_clustering(&overlay) } else { before };
    ClusteringProbe {
        origin,
        dest,
        added,
        before,
        after,
    }
}
