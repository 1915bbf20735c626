//! Read-only graph views.
//!
//! [`GraphView`] is the index-level read interface consumed by metrics.
//! [`GraphOverlay`] layers a handful of hypothetical edges over a borrowed
//! base graph, so a what-if probe never has to copy the whole graph.

use std::collections::BTreeSet;
use std::hash::Hash;

use crate::graph::Graph;
use crate::orientation::Orientation;

/// Index-level read access to a graph structure.
pub trait GraphView {
    fn num_nodes(&self) -> usize;

    fn is_directed(&self) -> bool;

    /// True when an edge `origin -> dest` exists (either direction when undirected).
    fn has_edge(&self, origin: usize, dest: usize) -> bool;

    /// Neighbour indices in ascending order.
    fn neighbours(&self, node: usize, orientation: Orientation) -> Vec<usize>;
}

impl<U: Clone + Eq + Hash> GraphView for Graph<U> {
    fn num_nodes(&self) -> usize {
        Graph::num_nodes(self)
    }

    fn is_directed(&self) -> bool {
        Graph::is_directed(self)
    }

    fn has_edge(&self, origin: usize, dest: usize) -> bool {
        self.contains_edge_idx(origin, dest)
    }

    fn neighbours(&self, node: usize, orientation: Orientation) -> Vec<usize> {
        self.neighbourhood_idx(node, orientation)
    }
}

/// Copy-on-write overlay: a base view plus extra edges.
///
/// Overlay edges only exist inside the overlay; the base graph is borrowed
/// immutably and never changes.
#[derive(Debug, Clone)]
pub struct GraphOverlay<'a, G: GraphView> {
    base: &'a G,
    extra: BTreeSet<(usize, usize)>,
}

impl<'a, G: GraphView> GraphOverlay<'a, G> {
    pub fn new(base: &'a G) -> Self {
        Self {
            base,
            extra: BTreeSet::new(),
        }
    }

    /// Overlay with a single hypothetical edge.
    pub fn with_edge(base: &'a G, origin: usize, dest: usize) -> Self {
        let mut overlay = Self::new(base);
        overlay.add_edge(origin, dest);
        overlay
    }

    /// Adds a hypothetical edge. Returns false if the edge already exists
    /// (in the base or the overlay) or an endpoint is out of range.
    pub fn add_edge(&mut self, origin: usize, dest: usize) -> bool {
        let n = self.base.num_nodes();
        if origin >= n || dest >= n || self.has_edge(origin, dest) {
            return false;
        }
        self.extra.insert(self.key(origin, dest))
    }

    /// Number of overlay edges.
    pub fn num_extra_edges(&self) -> usize {
        self.extra.len()
    }

    pub fn base(&self) -> &G {
        self.base
    }

    fn key(&self, origin: usize, dest: usize) -> (usize, usize) {
        if self.base.is_directed() {
            (origin, dest)
        } else {
            (origin.min(dest), origin.max(dest))
        }
    }

    fn has_extra(&self, origin: usize, dest: usize) -> bool {
        self.extra.contains(&self.key(origin, dest))
    }
}

impl<G: GraphView> GraphView for GraphOverlay<'_, G> {
    fn num_nodes(&self) -> usize {
        self.base.num_nodes()
    }

    fn is_directed(&self) -> bool {
        self.base.is_directed()
    }

    fn has_edge(&self, origin: usize, dest: usize) -> bool {
        self.base.has_edge(origin, dest) || self.has_extra(origin, dest)
    }

    fn neighbours(&self, node: usize, orientation: Orientation) -> Vec<usize> {
        let mut result = self.base.neighbours(node, orientation);
        if self.extra.is_empty() {
            return result;
        }
        let (out, inc): (Vec<usize>, Vec<usize>) = if self.is_directed() {
            (
                self.extra
                    .iter()
                    .filter(|(o, _)| *o == node)
                    .map(|(_, d)| *d)
                    .collect(),
                self.extra
                    .iter()
                    .filter(|(_, d)| *d == node)
                    .map(|(o, _)| *o)
                    .collect(),
            )
        } else {
            let adjacent: Vec<usize> = self
                .extra
                .iter()
                .filter_map(|&(a, b)| {
                    if a == node {
                        Some(b)
                    } else if b == node {
                        Some(a)
                    } else {
                        None
                    }
                })
                .collect();
            (adjacent.clone(), adjacent)
        };

        match orientation {
            Orientation::Out => result.extend(out),
            Orientation::In => result.extend(inc),
            Orientation::Und => {
                result.extend(out);
                result.extend(inc);
            }
            Orientation::Mutual => {
                // A new edge can complete a reciprocal pair in either direction.
                result.extend(out.into_iter().filter(|&d| self.has_edge(d, node)));
                result.extend(inc.into_iter().filter(|&o| self.has_edge(node, o)));
            }
        }
        result.sort_unstable();
        result.dedup();
        result
    }
}
