//! Graph error types.

use thiserror::Error;

/// Errors raised by graph construction, configuration-dependent queries and
/// the file readers.
///
/// Traversal queries never fail: an unknown node simply has no neighbours.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The operation needs a capability the graph was not built with
    /// (for example a multigraph query on a simple graph).
    #[error("operation not configured for this graph: {0}")]
    NotConfigured(&'static str),

    /// The graph configuration itself is inconsistent.
    #[error("bad graph configuration: {0}")]
    BadConfiguration(String),

    /// A line of an input file could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
