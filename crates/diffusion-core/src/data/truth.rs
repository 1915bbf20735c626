//! Ground-truth propagation records.

use diffusion_events::{PieceIdx, UserIdx};
use std::collections::BTreeMap;

/// Observed (user, piece) repropagations with their earliest timestamp.
#[derive(Debug, Clone, Default)]
pub struct RealPropagation {
    entries: BTreeMap<(UserIdx, PieceIdx), i64>,
}

impl RealPropagation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a repropagation, keeping the earliest timestamp.
    pub fn insert(&mut self, user: UserIdx, piece: PieceIdx, timestamp: i64) {
        self.entries
            .entry((user, piece))
            .and_modify(|ts| *ts = (*ts).min(timestamp))
            .or_insert(timestamp);
    }

    pub fn contains(&self, user: UserIdx, piece: PieceIdx) -> bool {
        self.entries.contains_key(&(user, piece))
    }

    pub fn timestamp(&self, user: UserIdx, piece: PieceIdx) -> Option<i64> {
        self.entries.get(&(user, piece)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded pairs in (user, piece) order.
    pub fn iter(&self) -> impl Iterator<Item = (UserIdx, PieceIdx, i64)> + '_ {
        self.entries.iter().map(|(&(u, p), &ts)| (u, p, ts))
    }
}
