//! User State
//!
//! Per-user diffusion state. A piece lives in at most one of `received`,
//! `propagated` and `discarded`; own pieces are tracked separately and move
//! into `propagated` once delivered.

use diffusion_events::{PieceIdx, UserIdx};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::mechanisms::UpdateMechanism;

/// Metadata of a piece a user holds without having propagated it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedInfo {
    pub piece: PieceIdx,
    /// Iteration of the first delivery.
    pub first_iteration: u64,
    /// Timestamp of the first delivery.
    pub first_timestamp: i64,
    /// Iteration of the most recent delivery.
    pub last_iteration: u64,
    /// Number of deliveries so far.
    pub times: u32,
    pub senders: BTreeSet<UserIdx>,
}

impl ReceivedInfo {
    /// A single delivery of `piece` from `sender`.
    pub fn delivered(piece: PieceIdx, sender: UserIdx, iteration: u64, timestamp: i64) -> Self {
        Self {
            piece,
            first_iteration: iteration,
            first_timestamp: timestamp,
            last_iteration: iteration,
            times: 1,
            senders: BTreeSet::from([sender]),
        }
    }
}

/// Outcome of delivering a piece to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The user created the piece; nothing changes.
    Own,
    /// The user already propagated the piece.
    AlreadyPropagated,
    /// The piece was pending and its metadata got merged.
    Repeated,
    /// A discarded piece came back into the pending pool.
    Restored,
    /// The user had never held the piece.
    New,
}

/// Diffusion state of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    user: UserIdx,
    own: BTreeSet<PieceIdx>,
    received: BTreeMap<PieceIdx, ReceivedInfo>,
    propagated: BTreeSet<PieceIdx>,
    #[serde(default)]
    discarded: BTreeMap<PieceIdx, ReceivedInfo>,
    /// neighbour -> iteration it was last contacted
    #[serde(default)]
    last_contact: BTreeMap<UserIdx, u64>,
}

impl UserState {
    pub fn new(user: UserIdx) -> Self {
        Self {
            user,
            own: BTreeSet::new(),
            received: BTreeMap::new(),
            propagated: BTreeSet::new(),
            discarded: BTreeMap::new(),
            last_contact: BTreeMap::new(),
        }
    }

    pub fn user(&self) -> UserIdx {
        self.user
    }

    pub fn own(&self) -> &BTreeSet<PieceIdx> {
        &self.own
    }

    pub fn received(&self) -> &BTreeMap<PieceIdx, ReceivedInfo> {
        &self.received
    }

    pub fn propagated(&self) -> &BTreeSet<PieceIdx> {
        &self.propagated
    }

    pub fn discarded(&self) -> &BTreeMap<PieceIdx, ReceivedInfo> {
        &self.discarded
    }

    pub fn is_own(&self, piece: PieceIdx) -> bool {
        self.own.contains(&piece)
    }

    pub fn has_received(&self, piece: PieceIdx) -> bool {
        self.received.contains_key(&piece)
    }

    pub fn has_propagated(&self, piece: PieceIdx) -> bool {
        self.propagated.contains(&piece)
    }

    /// True if the user created, received or already propagated `piece`.
    pub fn holds(&self, piece: PieceIdx) -> bool {
        self.own.contains(&piece)
            || self.received.contains_key(&piece)
            || self.propagated.contains(&piece)
    }

    /// Own pieces not yet propagated, ascending.
    pub fn pending_own(&self) -> impl Iterator<Item = PieceIdx> + '_ {
        self.own
            .iter()
            .filter(move |p| !self.propagated.contains(p))
            .copied()
    }

    /// True if the user holds anything it could still propagate.
    pub fn has_pending(&self) -> bool {
        !self.received.is_empty() || self.pending_own().next().is_some()
    }

    /// True if `piece` may be propagated now.
    pub fn can_propagate(&self, piece: PieceIdx) -> bool {
        !self.propagated.contains(&piece)
            && (self.own.contains(&piece) || self.received.contains_key(&piece))
    }

    pub fn add_own(&mut self, piece: PieceIdx) -> bool {
        self.own.insert(piece)
    }

    /// Moves a held piece into `propagated`.
    ///
    /// Returns true only for the first propagation of the piece; pieces the
    /// user does not hold are ignored.
    pub fn mark_propagated(&mut self, piece: PieceIdx) -> bool {
        if !self.can_propagate(piece) {
            return false;
        }
        self.received.remove(&piece);
        self.propagated.insert(piece);
        self.debug_check();
        true
    }

    /// Delivers a piece, merging with any metadata the user already has.
    pub fn receive(&mut self, info: ReceivedInfo, update: &dyn UpdateMechanism) -> Arrival {
        let piece = info.piece;
        if self.own.contains(&piece) {
            return Arrival::Own;
        }
        if self.propagated.contains(&piece) {
            return Arrival::AlreadyPropagated;
        }
        let arrival = if let Some(old) = self.received.remove(&piece) {
            self.received.insert(piece, update.update_seen(&old, &info));
            Arrival::Repeated
        } else if let Some(old) = self.discarded.remove(&piece) {
            self.received.insert(piece, update.update_discarded(&old, &info));
            Arrival::Restored
        } else {
            self.received.insert(piece, info);
            Arrival::New
        };
        self.debug_check();
        arrival
    }

    /// Moves a pending piece into `discarded`. Returns false if it was not
    /// pending.
    pub fn discard(&mut self, piece: PieceIdx) -> bool {
        match self.received.remove(&piece) {
            Some(info) => {
                self.discarded.insert(piece, info);
                true
            }
            None => false,
        }
    }

    pub fn record_contact(&mut self, neighbour: UserIdx, iteration: u64) {
        self.last_contact.insert(neighbour, iteration);
    }

    pub fn last_contact(&self, neighbour: UserIdx) -> Option<u64> {
        self.last_contact.get(&neighbour).copied()
    }

    /// A neighbour contacted at iteration `t` is available again once
    /// `iteration - t > wait_time`.
    pub fn can_contact(&self, neighbour: UserIdx, iteration: u64, wait_time: u64) -> bool {
        self.last_contact(neighbour)
            .map_or(true, |t| iteration.saturating_sub(t) > wait_time)
    }

    fn debug_check(&self) {
        debug_assert!(
            self.received.keys().all(|p| !self.propagated.contains(p)),
            "user {} holds a piece both received and propagated",
            self.user
        );
        debug_assert!(
            self.received.keys().all(|p| !self.discarded.contains_key(p)),
            "user {} holds a piece both received and discarded",
            self.user
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanisms::update::OlderUpdate;

    fn delivery(piece: u32, sender: u32, iteration: u64) -> ReceivedInfo {
        ReceivedInfo::delivered(PieceIdx(piece), UserIdx(sender), iteration, iteration as i64 * 10)
    }

    #[test]
    fn test_receive_then_propagate() {
        let mut state = UserState::new(UserIdx(1));
        assert!(!state.has_pending());

        assert_eq!(state.receive(delivery(0, 0, 1), &OlderUpdate), Arrival::New);
        assert!(state.has_pending());
        assert_eq!(state.receive(delivery(0, 2, 2), &OlderUpdate), Arrival::Repeated);
        let info = &state.received()[&PieceIdx(0)];
        assert_eq!(info.times, 2);
        assert_eq!(info.first_iteration, 1);
        assert_eq!(info.last_iteration, 2);

        assert!(state.mark_propagated(PieceIdx(0)));
        assert!(!state.has_received(PieceIdx(0)));
        assert!(!state.mark_propagated(PieceIdx(0)));
        assert_eq!(
            state.receive(delivery(0, 0, 3), &OlderUpdate),
            Arrival::AlreadyPropagated
        );
        assert!(!state.has_received(PieceIdx(0)));
    }

    #[test]
    fn test_own_pieces() {
        let mut state = UserState::new(UserIdx(0));
        state.add_own(PieceIdx(4));
        assert_eq!(state.pending_own().collect::<Vec<_>>(), vec![PieceIdx(4)]);
        assert_eq!(state.receive(delivery(4, 1, 1), &OlderUpdate), Arrival::Own);
        assert!(state.mark_propagated(PieceIdx(4)));
        assert_eq!(state.pending_own().count(), 0);
        assert!(!state.has_pending());
    }

    #[test]
    fn test_cannot_propagate_unknown_piece() {
        let mut state = UserState::new(UserIdx(0));
        assert!(!state.mark_propagated(PieceIdx(9)));
        assert!(state.propagated().is_empty());
    }

    #[test]
    fn test_discard_and_restore() {
        let mut state = UserState::new(UserIdx(1));
        state.receive(delivery(0, 0, 1), &OlderUpdate);
        assert!(state.discard(PieceIdx(0)));
        assert!(!state.discard(PieceIdx(0)));
        assert!(!state.has_pending());
        assert!(state.discarded().contains_key(&PieceIdx(0)));

        assert_eq!(state.receive(delivery(0, 2, 5), &OlderUpdate), Arrival::Restored);
        assert!(state.discarded().is_empty());
        let info = &state.received()[&PieceIdx(0)];
        assert_eq!(info.times, 2);
        assert_eq!(info.senders.len(), 2);
    }

    #[test]
    fn test_wait_time_gating() {
        let mut state = UserState::new(UserIdx(0));
        assert!(state.can_contact(UserIdx(1), 1, 2));
        state.record_contact(UserIdx(1), 1);
        assert!(!state.can_contact(UserIdx(1), 2, 2));
        assert!(!state.can_contact(UserIdx(1), 3, 2));
        assert!(state.can_contact(UserIdx(1), 4, 2));
        // wait_time 0 allows the next iteration
        assert!(state.can_contact(UserIdx(1), 2, 0));
    }

    #[test]
    fn test_state_serde() {
        let mut state = UserState::new(UserIdx(3));
        state.add_own(PieceIdx(1));
        state.receive(delivery(0, 2, 1), &OlderUpdate);
        state.record_contact(UserIdx(2), 1);
        let json = serde_json::to_string(&state).unwrap();
        let back: UserState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
