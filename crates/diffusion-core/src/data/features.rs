//! Feature Tables
//!
//! Weighted categorical features attached to users or pieces, one table per
//! feature name.

use serde::{Deserialize, Serialize};
use socnet_graph::Index;
use std::collections::BTreeMap;

/// Assignments of one feature to entities (users or pieces).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    values: Index<String>,
    /// entity index -> (value index, weight), in insertion order
    assignments: BTreeMap<usize, Vec<(usize, f64)>>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `entity`. Repeated pairs accumulate their weight.
    pub fn assign(&mut self, entity: usize, value: &str, weight: f64) {
        let (value_idx, _) = self.values.insert(value.to_string());
        let entry = self.assignments.entry(entity).or_default();
        match entry.iter_mut().find(|(v, _)| *v == value_idx) {
            Some((_, w)) => *w += weight,
            None => entry.push((value_idx, weight)),
        }
    }

    /// Values and weights of an entity; empty if it has none.
    pub fn values_of(&self, entity: usize) -> Vec<(&str, f64)> {
        self.assignments
            .get(&entity)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter_map(|&(v, w)| self.values.get(v).map(|s| (s.as_str(), w)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of distinct values seen for this feature.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn num_entities(&self) -> usize {
        self.assignments.len()
    }
}
