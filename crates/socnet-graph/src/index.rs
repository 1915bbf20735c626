//! Bidirectional Index
//!
//! Maps opaque identifiers to dense `usize` indices and back. Indices are
//! assigned in insertion order and never reused: the index is append-only,
//! so an index handed out once stays valid for the lifetime of the map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Append-only bidirectional map between identifiers and dense indices.
///
/// Serializes as the plain list of items in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    from = "Vec<T>",
    into = "Vec<T>",
    bound(serialize = "T: Serialize + Clone", deserialize = "T: Deserialize<'de> + Clone")
)]
pub struct Index<T: Eq + Hash> {
    items: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Eq + Hash> Default for Index<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> Index<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from an iterator, skipping duplicates.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut index = Self::new();
        for item in items {
            index.insert(item);
        }
        index
    }

    /// Inserts an item, returning its index and whether it was new.
    pub fn insert(&mut self, item: T) -> (usize, bool) {
        if let Some(&idx) = self.positions.get(&item) {
            return (idx, false);
        }
        let idx = self.items.len();
        self.positions.insert(item.clone(), idx);
        self.items.push(item);
        (idx, true)
    }

    /// Index of an item, if present.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.positions.get(item).copied()
    }

    /// Item stored at an index, if in range.
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }
}

impl<T: Clone + Eq + Hash> From<Vec<T>> for Index<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_items(items)
    }
}

impl<T: Eq + Hash> From<Index<T>> for Vec<T> {
    fn from(index: Index<T>) -> Self {
        index.items
    }
}
