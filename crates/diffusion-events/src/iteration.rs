//! Iteration Records
//!
//! One [`Iteration`] is produced per simulation step. Records are immutable
//! once emitted and are the unit consumed by checkpoints and metrics.
//! All per-user maps are ordered so the JSON form is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{PieceIdx, UserIdx};

/// A piece delivered to a user during one iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenPiece {
    pub piece: PieceIdx,
    /// Deliveries of this piece to the user in this iteration.
    pub times: u32,
    /// Users who delivered it, ascending.
    pub senders: Vec<UserIdx>,
    /// True when the user had never held the piece before.
    pub first_time: bool,
}

/// Deltas of a single simulation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    /// Sequence number; 0 is the seeding step.
    pub number: u64,
    /// Clock value of this step.
    pub timestamp: i64,
    /// Own pieces assigned to each creator (seeding step only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub owned: BTreeMap<UserIdx, Vec<PieceIdx>>,
    /// Pieces that landed in each user's pending pool.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub seen: BTreeMap<UserIdx, Vec<SeenPiece>>,
    /// Deliveries of pieces the user had already propagated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub re_received: BTreeMap<UserIdx, Vec<SeenPiece>>,
    /// First-propagation events.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub propagated: BTreeMap<UserIdx, Vec<PieceIdx>>,
    /// Pending pieces dropped by expiration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub discarded: BTreeMap<UserIdx, Vec<PieceIdx>>,
    /// First-propagation events in this step.
    pub num_new_propagated: usize,
    /// First-propagation events up to and including this step.
    pub total_propagated: usize,
    /// Distinct users who have propagated at least once so far.
    pub total_propagating_users: usize,
}

impl Iteration {
    /// Creates an empty record.
    pub fn new(number: u64, timestamp: i64) -> Self {
        Self {
            number,
            timestamp,
            owned: BTreeMap::new(),
            seen: BTreeMap::new(),
            re_received: BTreeMap::new(),
            propagated: BTreeMap::new(),
            discarded: BTreeMap::new(),
            num_new_propagated: 0,
            total_propagated: 0,
            total_propagating_users: 0,
        }
    }

    /// True for the seeding step.
    pub fn is_seed(&self) -> bool {
        self.number == 0
    }

    /// Users who received at least one piece into their pending pool.
    pub fn receiving_users(&self) -> impl Iterator<Item = UserIdx> + '_ {
        self.seen.keys().copied()
    }

    /// Users who propagated at least one piece for the first time.
    pub fn propagating_users(&self) -> impl Iterator<Item = UserIdx> + '_ {
        self.propagated.keys().copied()
    }

    /// Pieces seen by a user in this step.
    pub fn seen_by(&self, user: UserIdx) -> &[SeenPiece] {
        self.seen.get(&user).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Pieces a user propagated for the first time in this step.
    pub fn propagated_by(&self, user: UserIdx) -> &[PieceIdx] {
        self.propagated.get(&user).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Pieces discarded by a user in this step.
    pub fn discarded_by(&self, user: UserIdx) -> &[PieceIdx] {
        self.discarded.get(&user).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Number of (user, piece) pairs seen in this step.
    pub fn num_seen(&self) -> usize {
        self.seen.values().map(|v| v.len()).sum()
    }

    /// Number of (user, piece) pairs seen for the first time.
    pub fn num_first_seen(&self) -> usize {
        self.seen
            .values()
            .flat_map(|v| v.iter())
            .filter(|s| s.first_time)
            .count()
    }

    pub fn num_re_received(&self) -> usize {
        self.re_received.values().map(|v| v.len()).sum()
    }

    pub fn num_discarded(&self) -> usize {
        self.discarded.values().map(|v| v.len()).sum()
    }

    /// Serializes the record to a JSON line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a record from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Iteration {
        let mut it = Iteration::new(2, 20);
        it.seen.insert(
            UserIdx(1),
            vec![
                SeenPiece {
                    piece: PieceIdx(0),
                    times: 2,
                    senders: vec![UserIdx(0), UserIdx(2)],
                    first_time: true,
                },
                SeenPiece {
                    piece: PieceIdx(3),
                    times: 1,
                    senders: vec![UserIdx(0)],
                    first_time: false,
                },
            ],
        );
        it.propagated.insert(UserIdx(0), vec![PieceIdx(0), PieceIdx(3)]);
        it.num_new_propagated = 2;
        it.total_propagated = 5;
        it
    }

    #[test]
    fn test_counts() {
        let it = sample();
        assert!(!it.is_seed());
        assert_eq!(it.num_seen(), 2);
        assert_eq!(it.num_first_seen(), 1);
        assert_eq!(it.receiving_users().collect::<Vec<_>>(), vec![UserIdx(1)]);
        assert_eq!(it.propagating_users().collect::<Vec<_>>(), vec![UserIdx(0)]);
        assert!(it.seen_by(UserIdx(9)).is_empty());
        assert_eq!(it.propagated_by(UserIdx(0)).len(), 2);
    }

    #[test]
    fn test_iteration_jsonl() {
        let it = sample();
        let line = it.to_jsonl().unwrap();
        assert!(!line.contains('\n'));
        assert!(!line.contains("discarded"));
        let parsed = Iteration::from_jsonl(&line).unwrap();
        assert_eq!(parsed, it);
    }
}
