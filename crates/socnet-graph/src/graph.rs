//! Graph Store
//!
//! Array-backed adjacency storage indexed by dense node indices. Each node
//! keeps an ordered map of outgoing and incoming neighbours, so every
//! neighbourhood query returns nodes in index order and results are
//! reproducible across runs.
//!
//! Undirected graphs store each edge in both directions at insertion time,
//! which makes `In`, `Out`, `Und` and `Mutual` neighbourhoods coincide.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hash;

use crate::edge::{EdgeInfo, DEFAULT_TYPE, DEFAULT_WEIGHT, ERROR_TYPE, ERROR_WEIGHT};
use crate::error::GraphError;
use crate::index::Index;
use crate::matrix::{MatrixMode, SparseMatrix};
use crate::orientation::Orientation;

/// Structural options fixed at graph creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Edges are ordered pairs when true.
    pub directed: bool,
    /// Several edges may join the same ordered pair when true.
    pub multigraph: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            directed: true,
            multigraph: false,
        }
    }
}

type Adjacency = BTreeMap<usize, Vec<EdgeInfo>>;

/// Mutable social network graph.
///
/// Nodes can only be added. Edges are stored per ordered pair; a simple
/// graph keeps at most one [`EdgeInfo`] per pair, a multigraph keeps a list.
#[derive(Debug, Clone)]
pub struct Graph<U: Clone + Eq + Hash> {
    config: GraphConfig,
    nodes: Index<U>,
    outgoing: Vec<Adjacency>,
    incoming: Vec<Adjacency>,
    num_edges: usize,
}

impl<U: Clone + Eq + Hash> Graph<U> {
    /// Creates an empty graph with the given configuration.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: Index::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            num_edges: 0,
        }
    }

    /// Empty directed simple graph.
    pub fn directed() -> Self {
        Self::new(GraphConfig {
            directed: true,
            multigraph: false,
        })
    }

    /// Empty undirected simple graph.
    pub fn undirected() -> Self {
        Self::new(GraphConfig {
            directed: false,
            multigraph: false,
        })
    }

    /// Empty multigraph with the given directedness.
    pub fn multigraph(directed: bool) -> Self {
        Self::new(GraphConfig {
            directed,
            multigraph: true,
        })
    }

    pub fn config(&self) -> GraphConfig {
        self.config
    }

    pub fn is_directed(&self) -> bool {
        self.config.directed
    }

    pub fn is_multigraph(&self) -> bool {
        self.config.multigraph
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Adds a node. Returns false if it was already present.
    pub fn add_node(&mut self, id: U) -> bool {
        let (_, inserted) = self.nodes.insert(id);
        if inserted {
            self.outgoing.push(BTreeMap::new());
            self.incoming.push(BTreeMap::new());
        }
        inserted
    }

    pub fn contains_node(&self, id: &U) -> bool {
        self.nodes.contains(id)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Dense index of a node.
    pub fn node_index(&self, id: &U) -> Option<usize> {
        self.nodes.index_of(id)
    }

    /// Node stored at a dense index.
    pub fn node(&self, idx: usize) -> Option<&U> {
        self.nodes.get(idx)
    }

    /// Nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &U> + '_ {
        self.nodes.iter()
    }

    /// The node index map.
    pub fn index(&self) -> &Index<U> {
        &self.nodes
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Adds an edge between two nodes.
    ///
    /// Returns false when an endpoint is missing and `auto_create_nodes` is
    /// false, or when the pair is already joined in a simple graph.
    pub fn add_edge(
        &mut self,
        origin: &U,
        dest: &U,
        weight: f64,
        kind: i32,
        auto_create_nodes: bool,
    ) -> bool {
        if auto_create_nodes {
            self.add_node(origin.clone());
            self.add_node(dest.clone());
        }
        match (self.node_index(origin), self.node_index(dest)) {
            (Some(o), Some(d)) => self.add_edge_idx(o, d, EdgeInfo::new(weight, kind)),
            _ => false,
        }
    }

    /// Adds an edge with default weight and type between existing nodes.
    pub fn add_default_edge(&mut self, origin: &U, dest: &U) -> bool {
        self.add_edge(origin, dest, DEFAULT_WEIGHT, DEFAULT_TYPE, false)
    }

    /// Adds an edge between two node indices.
    pub fn add_edge_idx(&mut self, origin: usize, dest: usize, info: EdgeInfo) -> bool {
        let n = self.num_nodes();
        if origin >= n || dest >= n {
            return false;
        }
        if !self.config.multigraph && self.outgoing[origin].contains_key(&dest) {
            return false;
        }

        self.outgoing[origin].entry(dest).or_default().push(info);
        self.incoming[dest].entry(origin).or_default().push(info);
        if !self.config.directed && origin != dest {
            self.outgoing[dest].entry(origin).or_default().push(info);
            self.incoming[origin].entry(dest).or_default().push(info);
        }
        self.num_edges += 1;
        true
    }

    /// Number of edges. Undirected edges count once.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn contains_edge(&self, origin: &U, dest: &U) -> bool {
        match (self.node_index(origin), self.node_index(dest)) {
            (Some(o), Some(d)) => self.contains_edge_idx(o, d),
            _ => false,
        }
    }

    pub fn contains_edge_idx(&self, origin: usize, dest: usize) -> bool {
        self.outgoing
            .get(origin)
            .is_some_and(|adj| adj.contains_key(&dest))
    }

    /// First edge stored between two nodes.
    pub fn edge(&self, origin: &U, dest: &U) -> Option<&EdgeInfo> {
        let (o, d) = (self.node_index(origin)?, self.node_index(dest)?);
        self.edge_idx(o, d)
    }

    pub fn edge_idx(&self, origin: usize, dest: usize) -> Option<&EdgeInfo> {
        self.outgoing.get(origin)?.get(&dest)?.first()
    }

    /// Weight of the edge, or [`ERROR_WEIGHT`] when there is none.
    pub fn edge_weight(&self, origin: &U, dest: &U) -> f64 {
        self.edge(origin, dest)
            .map(|e| e.weight)
            .unwrap_or(ERROR_WEIGHT)
    }

    /// Type of the edge, or [`ERROR_TYPE`] when there is none.
    pub fn edge_type(&self, origin: &U, dest: &U) -> i32 {
        self.edge(origin, dest).map(|e| e.kind).unwrap_or(ERROR_TYPE)
    }

    /// All weights stored between two nodes of a multigraph.
    pub fn edge_weights(&self, origin: &U, dest: &U) -> Result<Vec<f64>, GraphError> {
        Ok(self.multi_edges(origin, dest)?.iter().map(|e| e.weight).collect())
    }

    /// All types stored between two nodes of a multigraph.
    pub fn edge_types(&self, origin: &U, dest: &U) -> Result<Vec<i32>, GraphError> {
        Ok(self.multi_edges(origin, dest)?.iter().map(|e| e.kind).collect())
    }

    fn multi_edges(&self, origin: &U, dest: &U) -> Result<&[EdgeInfo], GraphError> {
        if !self.config.multigraph {
            return Err(GraphError::NotConfigured("multigraph edge lists"));
        }
        let edges = match (self.node_index(origin), self.node_index(dest)) {
            (Some(o), Some(d)) => self.outgoing[o].get(&d).map(|v| v.as_slice()),
            _ => None,
        };
        Ok(edges.unwrap_or(&[]))
    }

    /// Every stored edge as `(origin, dest, info)`.
    ///
    /// Undirected edges are reported once, with `origin <= dest`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &EdgeInfo)> + '_ {
        let directed = self.config.directed;
        self.outgoing.iter().enumerate().flat_map(move |(o, adj)| {
            adj.iter()
                .filter(move |(d, _)| directed || o <= **d)
                .flat_map(move |(d, infos)| infos.iter().map(move |info| (o, *d, info)))
        })
    }

    // ------------------------------------------------------------------
    // Neighbourhoods
    // ------------------------------------------------------------------

    /// Neighbours of a node under an orientation, in index order.
    ///
    /// Unknown nodes have no neighbours.
    pub fn neighbourhood(&self, id: &U, orientation: Orientation) -> impl Iterator<Item = &U> + '_ {
        let neighbours = self
            .node_index(id)
            .map(|idx| self.neighbourhood_idx(idx, orientation))
            .unwrap_or_default();
        neighbours.into_iter().filter_map(move |n| self.nodes.get(n))
    }

    /// Neighbour indices of a node index under an orientation.
    pub fn neighbourhood_idx(&self, idx: usize, orientation: Orientation) -> Vec<usize> {
        let (Some(out), Some(inc)) = (self.outgoing.get(idx), self.incoming.get(idx)) else {
            return Vec::new();
        };
        match orientation {
            Orientation::Out => out.keys().copied().collect(),
            Orientation::In => inc.keys().copied().collect(),
            Orientation::Und => {
                let mut all: Vec<usize> = out.keys().chain(inc.keys()).copied().collect();
                all.sort_unstable();
                all.dedup();
                all
            }
            Orientation::Mutual => out
                .keys()
                .filter(|n| inc.contains_key(n))
                .copied()
                .collect(),
        }
    }

    /// Number of neighbours under an orientation.
    pub fn degree(&self, id: &U, orientation: Orientation) -> usize {
        self.node_index(id)
            .map(|idx| self.degree_idx(idx, orientation))
            .unwrap_or(0)
    }

    pub fn degree_idx(&self, idx: usize, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Out => self.outgoing.get(idx).map_or(0, |a| a.len()),
            Orientation::In => self.incoming.get(idx).map_or(0, |a| a.len()),
            _ => self.neighbourhood_idx(idx, orientation).len(),
        }
    }

    // ------------------------------------------------------------------
    // Derived structures
    // ------------------------------------------------------------------

    /// Adjacency matrix for an orientation.
    ///
    /// Entry `(i, j)` is present iff `j` is in the `orientation`
    /// neighbourhood of `i`. In weighted mode `Out` stores the weight of
    /// `i -> j`, `In` the weight of `j -> i`, and `Und`/`Mutual` the sum of
    /// both directions (a single weight for undirected graphs). Multigraph
    /// weights are summed. `Und` and `Mutual` matrices are symmetric.
    pub fn adjacency_matrix(&self, orientation: Orientation, mode: MatrixMode) -> SparseMatrix {
        let n = self.num_nodes();
        let rows = (0..n)
            .map(|i| {
                self.neighbourhood_idx(i, orientation)
                    .into_iter()
                    .map(|j| {
                        let value = match mode {
                            MatrixMode::Binary => 1.0,
                            MatrixMode::Weighted => self.relation_weight(i, j, orientation),
                        };
                        (j, value)
                    })
                    .collect()
            })
            .collect();
        SparseMatrix::from_rows(n, rows)
    }

    fn relation_weight(&self, i: usize, j: usize, orientation: Orientation) -> f64 {
        let sum = |o: usize, d: usize| -> f64 {
            self.outgoing[o]
                .get(&d)
                .map(|infos| infos.iter().map(|e| e.weight).sum())
                .unwrap_or(0.0)
        };
        match orientation {
            Orientation::Out => sum(i, j),
            Orientation::In => sum(j, i),
            Orientation::Und | Orientation::Mutual => {
                if self.config.directed {
                    sum(i, j) + sum(j, i)
                } else {
                    sum(i, j)
                }
            }
        }
    }

    /// Complement graph over the same nodes.
    ///
    /// Contains `(u, v)` for `u != v` iff this graph lacks it. The result is
    /// always a simple graph with default weights and types.
    pub fn complement(&self) -> Graph<U> {
        let mut complement = Graph::new(GraphConfig {
            directed: self.config.directed,
            multigraph: false,
        });
        for node in self.nodes() {
            complement.add_node(node.clone());
        }
        let n = self.num_nodes();
        for u in 0..n {
            let start = if self.config.directed { 0 } else { u + 1 };
            for v in start..n {
                if u != v && !self.contains_edge_idx(u, v) {
                    complement.add_edge_idx(u, v, EdgeInfo::default());
                }
            }
        }
        complement
    }
}
