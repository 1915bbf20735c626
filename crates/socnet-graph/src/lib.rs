//! Social network graph model.
//!
//! Indexed node/edge store shared by the diffusion engine and the metrics
//! crate. Nodes are opaque identifiers mapped to dense indices; edges carry a
//! weight and an integer type tag. Graphs may be directed or undirected and
//! simple or multigraphs.
//!
//! # Modules
//!
//! - [`graph`]: The mutable [`Graph`] store and its orientation-aware queries
//! - [`index`]: Append-only bidirectional id/index map
//! - [`matrix`]: Compressed sparse row adjacency matrices
//! - [`view`]: Read-only [`GraphView`] trait and the copy-on-write [`GraphOverlay`]
//! - [`io`]: Tab-separated edge list and index readers

pub mod edge;
pub mod error;
pub mod graph;
pub mod index;
pub mod io;
pub mod matrix;
pub mod orientation;
pub mod view;

pub use edge::{EdgeInfo, DEFAULT_TYPE, DEFAULT_WEIGHT, ERROR_TYPE, ERROR_WEIGHT};
pub use error::GraphError;
pub use graph::{Graph, GraphConfig};
pub use index::Index;
pub use io::{read_edge_list, read_edge_list_file, read_edges_into, read_index, read_index_file};
pub use matrix::{MatrixMode, SparseMatrix};
pub use orientation::{Orientation, ParseOrientationError};
pub use view::{GraphOverlay, GraphView};
