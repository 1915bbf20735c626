//! Diffusion Data
//!
//! Read-only inputs of a simulation: the social graph, the information
//! pieces with their creators, feature tables and optional ground-truth
//! propagation. Built once through [`DiffusionDataBuilder`] and borrowed by
//! the simulation and every mechanism.

pub mod features;
pub mod truth;

pub use features::FeatureTable;
pub use truth::RealPropagation;

use diffusion_events::{PieceIdx, UserIdx};
use socnet_graph::{Graph, Index, Orientation};
use std::collections::HashMap;

/// User identifiers are opaque strings read from input files.
pub type UserId = String;

/// Piece identifiers are opaque strings read from input files.
pub type PieceId = String;

/// An information piece: created by one or more users at a given time.
#[derive(Debug, Clone, PartialEq)]
pub struct InformationPiece {
    pub creators: Vec<UserIdx>,
    pub timestamp: i64,
}

/// Immutable inputs shared by every simulation step.
#[derive(Debug, Clone)]
pub struct DiffusionData {
    graph: Graph<UserId>,
    pieces: Index<PieceId>,
    piece_info: Vec<InformationPiece>,
    created_by: Vec<Vec<PieceIdx>>,
    user_features: HashMap<String, FeatureTable>,
    piece_features: HashMap<String, FeatureTable>,
    real_propagation: Option<RealPropagation>,
}

impl DiffusionData {
    /// Starts building data over a graph.
    pub fn builder(graph: Graph<UserId>) -> DiffusionDataBuilder {
        DiffusionDataBuilder::new(graph)
    }

    pub fn graph(&self) -> &Graph<UserId> {
        &self.graph
    }

    pub fn num_users(&self) -> usize {
        self.graph.num_nodes()
    }

    pub fn num_pieces(&self) -> usize {
        self.pieces.len()
    }

    pub fn user_index(&self, id: &str) -> Option<UserIdx> {
        self.graph.node_index(&id.to_string()).map(UserIdx::new)
    }

    pub fn user_id(&self, user: UserIdx) -> Option<&UserId> {
        self.graph.node(user.index())
    }

    pub fn piece_index(&self, id: &str) -> Option<PieceIdx> {
        self.pieces.index_of(&id.to_string()).map(PieceIdx::new)
    }

    pub fn piece_id(&self, piece: PieceIdx) -> Option<&PieceId> {
        self.pieces.get(piece.index())
    }

    pub fn piece(&self, piece: PieceIdx) -> Option<&InformationPiece> {
        self.piece_info.get(piece.index())
    }

    /// All piece indices in ascending order.
    pub fn pieces(&self) -> impl Iterator<Item = PieceIdx> {
        (0..self.pieces.len()).map(PieceIdx::new)
    }

    /// All user indices in ascending order.
    pub fn users(&self) -> impl Iterator<Item = UserIdx> {
        (0..self.num_users()).map(UserIdx::new)
    }

    /// Creators of a piece; empty for an unknown piece.
    pub fn creators(&self, piece: PieceIdx) -> &[UserIdx] {
        self.piece(piece).map(|p| p.creators.as_slice()).unwrap_or(&[])
    }

    /// Pieces a user created, ascending.
    pub fn pieces_created_by(&self, user: UserIdx) -> &[PieceIdx] {
        self.created_by
            .get(user.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Neighbours of a user in index order, never including the user itself.
    pub fn neighbours(&self, user: UserIdx, orientation: Orientation) -> Vec<UserIdx> {
        self.graph
            .neighbourhood_idx(user.index(), orientation)
            .into_iter()
            .filter(|&v| v != user.index())
            .map(UserIdx::new)
            .collect()
    }

    /// `(value, weight)` pairs of a piece feature; empty when absent.
    pub fn piece_features(&self, piece: PieceIdx, feature: &str) -> Vec<(&str, f64)> {
        self.piece_features
            .get(feature)
            .map(|t| t.values_of(piece.index()))
            .unwrap_or_default()
    }

    /// `(value, weight)` pairs of a user feature; empty when absent.
    pub fn user_features(&self, user: UserIdx, feature: &str) -> Vec<(&str, f64)> {
        self.user_features
            .get(feature)
            .map(|t| t.values_of(user.index()))
            .unwrap_or_default()
    }

    /// Number of distinct values of a feature.
    ///
    /// Piece features take precedence when a name is used for both users
    /// and pieces. Unknown features have zero values.
    pub fn num_feature_values(&self, feature: &str) -> usize {
        self.piece_features
            .get(feature)
            .or_else(|| self.user_features.get(feature))
            .map(|t| t.num_values())
            .unwrap_or(0)
    }

    pub fn has_real_propagation(&self) -> bool {
        self.real_propagation.is_some()
    }

    pub fn real_propagation(&self) -> Option<&RealPropagation> {
        self.real_propagation.as_ref()
    }

    /// True when the ground truth records `user` repropagating `piece`.
    pub fn is_real_repropagated_piece(&self, user: UserIdx, piece: PieceIdx) -> bool {
        self.real_propagation
            .as_ref()
            .map_or(false, |t| t.contains(user, piece))
    }

    /// Ground-truth timestamp of `user` repropagating `piece`.
    pub fn real_propagated_timestamp(&self, user: UserIdx, piece: PieceIdx) -> Option<i64> {
        self.real_propagation
            .as_ref()
            .and_then(|t| t.timestamp(user, piece))
    }
}

/// Incremental builder for [`DiffusionData`].
///
/// References to unknown users are dropped with a warning; references to
/// unknown pieces in feature or ground-truth records are skipped.
#[derive(Debug)]
pub struct DiffusionDataBuilder {
    graph: Graph<UserId>,
    pieces: Index<PieceId>,
    piece_info: Vec<InformationPiece>,
    user_features: HashMap<String, FeatureTable>,
    piece_features: HashMap<String, FeatureTable>,
    real_propagation: Option<RealPropagation>,
    skipped: usize,
}

impl DiffusionDataBuilder {
    pub fn new(graph: Graph<UserId>) -> Self {
        Self {
            graph,
            pieces: Index::new(),
            piece_info: Vec::new(),
            user_features: HashMap::new(),
            piece_features: HashMap::new(),
            real_propagation: None,
            skipped: 0,
        }
    }

    /// Registers a piece, or adds a creator to an already known one.
    ///
    /// The first timestamp given for a piece wins.
    pub fn add_piece(&mut self, piece: &str, creator: &str, timestamp: i64) -> &mut Self {
        let (idx, added) = self.pieces.insert(piece.to_string());
        if added {
            self.piece_info.push(InformationPiece {
                creators: Vec::new(),
                timestamp,
            });
        }
        match self.graph.node_index(&creator.to_string()) {
            Some(user) => {
                let creators = &mut self.piece_info[idx].creators;
                let user = UserIdx::new(user);
                if !creators.contains(&user) {
                    creators.push(user);
                }
            }
            None => {
                tracing::warn!("Piece {} names unknown creator {}, dropped", piece, creator);
                self.skipped += 1;
            }
        }
        self
    }

    /// Adds a piece without creators (it is never seeded).
    pub fn add_orphan_piece(&mut self, piece: &str, timestamp: i64) -> &mut Self {
        let (_, added) = self.pieces.insert(piece.to_string());
        if added {
            self.piece_info.push(InformationPiece {
                creators: Vec::new(),
                timestamp,
            });
        }
        self
    }

    pub fn add_user_feature(&mut self, feature: &str, user: &str, value: &str, weight: f64) -> &mut Self {
        match self.graph.node_index(&user.to_string()) {
            Some(idx) => self
                .user_features
                .entry(feature.to_string())
                .or_default()
                .assign(idx, value, weight),
            None => {
                tracing::debug!("Feature {} for unknown user {} skipped", feature, user);
                self.skipped += 1;
            }
        }
        self
    }

    pub fn add_piece_feature(&mut self, feature: &str, piece: &str, value: &str, weight: f64) -> &mut Self {
        match self.pieces.index_of(&piece.to_string()) {
            Some(idx) => self
                .piece_features
                .entry(feature.to_string())
                .or_default()
                .assign(idx, value, weight),
            None => {
                tracing::debug!("Feature {} for unknown piece {} skipped", feature, piece);
                self.skipped += 1;
            }
        }
        self
    }

    /// Records a ground-truth repropagation. Calling this at least once
    /// marks the data as having ground truth.
    pub fn add_real_propagation(&mut self, user: &str, piece: &str, timestamp: i64) -> &mut Self {
        let truth = self.real_propagation.get_or_insert_with(RealPropagation::new);
        let user_idx = self.graph.node_index(&user.to_string());
        let piece_idx = self.pieces.index_of(&piece.to_string());
        match (user_idx, piece_idx) {
            (Some(u), Some(p)) => truth.insert(UserIdx::new(u), PieceIdx::new(p), timestamp),
            _ => {
                tracing::debug!("Ground truth ({}, {}) references unknown ids, skipped", user, piece);
                self.skipped += 1;
            }
        }
        self
    }

    /// Marks the data as having ground truth even if it has no records.
    pub fn with_empty_real_propagation(&mut self) -> &mut Self {
        self.real_propagation.get_or_insert_with(RealPropagation::new);
        self
    }

    /// Number of records dropped so far because of unknown ids.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn build(self) -> DiffusionData {
        let mut created_by = vec![Vec::new(); self.graph.num_nodes()];
        for (idx, info) in self.piece_info.iter().enumerate() {
            for creator in &info.creators {
                created_by[creator.index()].push(PieceIdx::new(idx));
            }
        }
        if self.skipped > 0 {
            tracing::warn!("Dropped {} records referencing unknown users or pieces", self.skipped);
        }
        DiffusionData {
            graph: self.graph,
            pieces: self.pieces,
            piece_info: self.piece_info,
            created_by,
            user_features: self.user_features,
            piece_features: self.piece_features,
            real_propagation: self.real_propagation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_graph() -> Graph<UserId> {
        let mut graph = Graph::directed();
        for id in ["a", "b", "c"] {
            graph.add_node(id.to_string());
        }
        graph.add_default_edge(&"a".to_string(), &"b".to_string());
        graph.add_default_edge(&"b".to_string(), &"c".to_string());
        graph
    }

    #[test]
    fn test_pieces_and_creators() {
        let mut builder = DiffusionData::builder(chain_graph());
        builder
            .add_piece("p0", "a", 10)
            .add_piece("p0", "c", 99)
            .add_piece("p1", "b", 20)
            .add_piece("p2", "ghost", 30);
        assert_eq!(builder.skipped(), 1);
        let data = builder.build();

        assert_eq!(data.num_pieces(), 3);
        let p0 = data.piece_index("p0").unwrap();
        assert_eq!(data.creators(p0), &[UserIdx(0), UserIdx(2)]);
        assert_eq!(data.piece(p0).unwrap().timestamp, 10);
        // unknown creator dropped, piece kept
        let p2 = data.piece_index("p2").unwrap();
        assert!(data.creators(p2).is_empty());
        assert_eq!(data.pieces_created_by(UserIdx(0)), &[p0]);
        assert_eq!(data.piece_id(p2).map(String::as_str), Some("p2"));
    }

    #[test]
    fn test_features() {
        let mut builder = DiffusionData::builder(chain_graph());
        builder.add_piece("p0", "a", 0);
        builder
            .add_piece_feature("topic", "p0", "sports", 1.0)
            .add_user_feature("topic", "b", "music", 0.3)
            .add_user_feature("lang", "b", "en", 1.0)
            .add_user_feature("lang", "c", "es", 1.0)
            .add_piece_feature("topic", "p9", "x", 1.0);
        let data = builder.build();

        let p0 = data.piece_index("p0").unwrap();
        assert_eq!(data.piece_features(p0, "topic"), vec![("sports", 1.0)]);
        assert_eq!(data.user_features(UserIdx(1), "topic"), vec![("music", 0.3)]);
        assert!(data.user_features(UserIdx(0), "lang").is_empty());
        assert!(data.piece_features(p0, "missing").is_empty());
        assert_eq!(data.num_feature_values("lang"), 2);
        assert_eq!(data.num_feature_values("topic"), 1);
        assert_eq!(data.num_feature_values("missing"), 0);
    }

    #[test]
    fn test_real_propagation_lookups() {
        let mut builder = DiffusionData::builder(chain_graph());
        builder.add_piece("p0", "a", 0);
        let without = DiffusionData::builder(chain_graph()).build();
        assert!(!without.has_real_propagation());
        assert!(!without.is_real_repropagated_piece(UserIdx(1), PieceIdx(0)));

        builder.add_real_propagation("b", "p0", 5);
        let data = builder.build();
        assert!(data.has_real_propagation());
        assert!(data.is_real_repropagated_piece(UserIdx(1), PieceIdx(0)));
        assert!(!data.is_real_repropagated_piece(UserIdx(2), PieceIdx(0)));
        assert_eq!(data.real_propagated_timestamp(UserIdx(1), PieceIdx(0)), Some(5));
    }

    #[test]
    fn test_neighbours_skip_self_loops() {
        let mut graph = chain_graph();
        graph.add_default_edge(&"b".to_string(), &"b".to_string());
        let data = DiffusionData::builder(graph).build();
        assert_eq!(data.neighbours(UserIdx(1), Orientation::Out), vec![UserIdx(2)]);
        assert_eq!(data.neighbours(UserIdx(1), Orientation::In), vec![UserIdx(0)]);
        assert_eq!(data.neighbours(UserIdx(1), Orientation::Und), vec![UserIdx(0), UserIdx(2)]);
    }
}
