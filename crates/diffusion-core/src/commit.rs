//! Plan and Commit
//!
//! An iteration first plans every user's decisions against a frozen
//! snapshot, then commits the resulting deliveries. Commit works on sets,
//! so the order deliveries were produced in never affects the outcome.

use diffusion_events::{Iteration, PieceIdx, SeenPiece, UserIdx};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::mechanisms::{Contacts, UpdateMechanism};
use crate::state::{Arrival, ReceivedInfo, UserState};

/// Decisions of one user in one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub user: UserIdx,
    /// Pieces the user offers this iteration.
    pub selected: Vec<PieceIdx>,
    pub contacts: Contacts,
}

/// One piece moving from one user to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delivery {
    pub from: UserIdx,
    pub to: UserIdx,
    pub piece: PieceIdx,
}

/// Expands plans into deliveries.
///
/// `plans` must be indexed by user. Push targets get the sender's selected
/// pieces; a puller gets whatever its source selected. Duplicate triples
/// collapse into one delivery and self-deliveries are dropped.
pub fn collect_deliveries(plans: &[Plan]) -> Vec<Delivery> {
    let mut deliveries = BTreeSet::new();
    for plan in plans {
        for &target in &plan.contacts.push {
            if target == plan.user {
                continue;
            }
            for &piece in &plan.selected {
                deliveries.insert(Delivery {
                    from: plan.user,
                    to: target,
                    piece,
                });
            }
        }
        for &source in &plan.contacts.pull {
            if source == plan.user {
                continue;
            }
            let Some(source_plan) = plans.get(source.index()) else {
                continue;
            };
            for &piece in &source_plan.selected {
                deliveries.insert(Delivery {
                    from: source,
                    to: plan.user,
                    piece,
                });
            }
        }
    }
    deliveries.into_iter().collect()
}

/// Remembers every user contacted this iteration for wait-time gating.
pub fn record_contacts(states: &mut [UserState], plans: &[Plan], iteration: u64) {
    for plan in plans {
        let Some(state) = states.get_mut(plan.user.index()) else {
            continue;
        };
        for &other in plan.contacts.push.iter().chain(&plan.contacts.pull) {
            state.record_contact(other, iteration);
        }
    }
}

/// Applies deliveries to user states and records the deltas.
///
/// Only deliveries whose sender held the piece before the commit, and
/// whose target is another user, take effect. Senders are marked first (a
/// piece counts as propagated once it reaches at least one user), then
/// arrivals are grouped per (target, piece), folded through `update_seen`
/// and merged into the target's state.
pub fn apply_deliveries(
    states: &mut [UserState],
    deliveries: &[Delivery],
    update: &dyn UpdateMechanism,
    iteration: u64,
    timestamp: i64,
    record: &mut Iteration,
) {
    let unique: BTreeSet<Delivery> = deliveries
        .iter()
        .copied()
        .filter(|d| d.from != d.to && states.get(d.to.index()).is_some())
        .filter(|d| {
            states
                .get(d.from.index())
                .map_or(false, |s| s.holds(d.piece))
        })
        .collect();

    let senders: BTreeSet<(UserIdx, PieceIdx)> = unique.iter().map(|d| (d.from, d.piece)).collect();
    for (from, piece) in senders {
        let Some(state) = states.get_mut(from.index()) else {
            continue;
        };
        if state.mark_propagated(piece) {
            record.propagated.entry(from).or_default().push(piece);
            record.num_new_propagated += 1;
        }
    }

    let mut arrivals: BTreeMap<(UserIdx, PieceIdx), ReceivedInfo> = BTreeMap::new();
    for d in &unique {
        let info = ReceivedInfo::delivered(d.piece, d.from, iteration, timestamp);
        match arrivals.entry((d.to, d.piece)) {
            Entry::Occupied(mut e) => {
                let merged = update.update_seen(e.get(), &info);
                e.insert(merged);
            }
            Entry::Vacant(e) => {
                e.insert(info);
            }
        }
    }

    for ((to, piece), info) in arrivals {
        let Some(state) = states.get_mut(to.index()) else {
            continue;
        };
        let seen = SeenPiece {
            piece,
            times: info.times,
            senders: info.senders.iter().copied().collect(),
            first_time: false,
        };
        match state.receive(info, update) {
            Arrival::Own => {}
            Arrival::AlreadyPropagated => record.re_received.entry(to).or_default().push(seen),
            Arrival::Repeated | Arrival::Restored => record.seen.entry(to).or_default().push(seen),
            Arrival::New => record.seen.entry(to).or_default().push(SeenPiece {
                first_time: true,
                ..seen
            }),
        }
    }
}
