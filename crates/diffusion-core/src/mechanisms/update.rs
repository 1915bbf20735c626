//! Update Mechanisms
//!
//! Merge rules for repeated deliveries. Repetition counts are summed and
//! sender sets united in every policy; they differ in which first-seen
//! time survives.

use super::UpdateMechanism;
use crate::state::ReceivedInfo;

fn merge_with(
    old: &ReceivedInfo,
    new: &ReceivedInfo,
    pick_first: impl Fn(&ReceivedInfo, &ReceivedInfo) -> bool,
) -> ReceivedInfo {
    debug_assert_eq!(old.piece, new.piece);
    let first = if pick_first(old, new) { old } else { new };
    ReceivedInfo {
        piece: old.piece,
        first_iteration: first.first_iteration,
        first_timestamp: first.first_timestamp,
        last_iteration: old.last_iteration.max(new.last_iteration),
        times: old.times.saturating_add(new.times),
        senders: old.senders.union(&new.senders).copied().collect(),
    }
}

/// True when `a` was first seen no later than `b`.
///
/// Ties on (iteration, timestamp) are all equal, so either choice yields
/// the same merged value.
fn earlier(a: &ReceivedInfo, b: &ReceivedInfo) -> bool {
    (a.first_iteration, a.first_timestamp) <= (b.first_iteration, b.first_timestamp)
}

/// Keeps the earliest first-seen time.
#[derive(Debug, Clone, Copy, Default)]
pub struct OlderUpdate;

impl UpdateMechanism for OlderUpdate {
    fn update_seen(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo {
        merge_with(old, new, earlier)
    }

    fn update_discarded(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo {
        merge_with(old, new, earlier)
    }

    fn name(&self) -> &'static str {
        "older"
    }
}

/// Keeps the latest first-seen time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewerUpdate;

impl UpdateMechanism for NewerUpdate {
    fn update_seen(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo {
        merge_with(old, new, |a, b| !earlier(a, b))
    }

    fn update_discarded(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo {
        merge_with(old, new, |a, b| !earlier(a, b))
    }

    fn name(&self) -> &'static str {
        "newer"
    }
}

/// Like [`OlderUpdate`] for pending pieces, but a discarded piece that is
/// delivered again restarts from the later arrival.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetUpdate;

impl UpdateMechanism for ResetUpdate {
    fn update_seen(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo {
        merge_with(old, new, earlier)
    }

    fn update_discarded(&self, old: &ReceivedInfo, new: &ReceivedInfo) -> ReceivedInfo {
        merge_with(old, new, |a, b| !earlier(a, b))
    }

    fn name(&self) -> &'static str {
        "reset"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffusion_events::{PieceIdx, UserIdx};
    use proptest::prelude::*;

    fn info(sender: u32, iteration: u64, times: u32) -> ReceivedInfo {
        let mut info = ReceivedInfo::delivered(PieceIdx(0), UserIdx(sender), iteration, iteration as i64 * 10);
        info.times = times;
        info
    }

    #[test]
    fn test_older_keeps_earliest() {
        let merged = OlderUpdate.update_seen(&info(1, 5, 1), &info(2, 3, 2));
        assert_eq!(merged.first_iteration, 3);
        assert_eq!(merged.first_timestamp, 30);
        assert_eq!(merged.last_iteration, 5);
        assert_eq!(merged.times, 3);
        assert_eq!(merged.senders.len(), 2);
    }

    #[test]
    fn test_newer_keeps_latest() {
        let merged = NewerUpdate.update_seen(&info(1, 5, 1), &info(2, 3, 1));
        assert_eq!(merged.first_iteration, 5);
        assert_eq!(merged.times, 2);
    }

    #[test]
    fn test_reset_restarts_discarded() {
        let old = info(1, 2, 4);
        let new = info(2, 9, 1);
        let seen = ResetUpdate.update_seen(&old, &new);
        assert_eq!(seen.first_iteration, 2);
        let restored = ResetUpdate.update_discarded(&old, &new);
        assert_eq!(restored.first_iteration, 9);
        assert_eq!(restored.first_timestamp, 90);
        assert_eq!(restored.times, 5);
    }

    fn arb_info() -> impl Strategy<Value = ReceivedInfo> {
        (0u32..6, 0u64..10, 1u32..4).prop_map(|(s, i, t)| info(s, i, t))
    }

    proptest! {
        #[test]
        fn test_merges_commute(a in arb_info(), b in arb_info()) {
            for update in [&OlderUpdate as &dyn UpdateMechanism, &NewerUpdate, &ResetUpdate] {
                prop_assert_eq!(update.update_seen(&a, &b), update.update_seen(&b, &a));
                prop_assert_eq!(update.update_discarded(&a, &b), update.update_discarded(&b, &a));
            }
        }

        #[test]
        fn test_merges_associate(a in arb_info(), b in arb_info(), c in arb_info()) {
            for update in [&OlderUpdate as &dyn UpdateMechanism, &NewerUpdate, &ResetUpdate] {
                let left = update.update_seen(&update.update_seen(&a, &b), &c);
                let right = update.update_seen(&a, &update.update_seen(&b, &c));
                prop_assert_eq!(left, right);
            }
        }
    }
}
