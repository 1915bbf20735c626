//! Sample data fixtures for testing.
//!
//! This module provides ready-made test data for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // diffusion-events = { path = "../diffusion-events", features = ["test-fixtures"] }
//!
//! use diffusion_events::fixtures;
//!
//! let history = fixtures::sample_iterations();
//! ```

use crate::{Iteration, PieceIdx, SeenPiece, UserIdx};

/// Number of users in the sample history.
pub const SAMPLE_USERS: usize = 4;

/// Number of pieces in the sample history.
pub const SAMPLE_PIECES: usize = 2;

fn seen(piece: u32, sender: u32) -> SeenPiece {
    SeenPiece {
        piece: PieceIdx(piece),
        times: 1,
        senders: vec![UserIdx(sender)],
        first_time: true,
    }
}

/// Returns a four-step history over the chain `u0 -> u1 -> u2` plus an
/// isolated user `u3`.
///
/// - iteration 0: `u0` owns `p0`, `u3` owns `p1`
/// - iteration 1: `u0` propagates `p0`, `u1` sees it
/// - iteration 2: `u1` propagates `p0`, `u2` sees it
/// - iteration 3: nothing happens
pub fn sample_iterations() -> Vec<Iteration> {
    let mut seed = Iteration::new(0, 0);
    seed.owned.insert(UserIdx(0), vec![PieceIdx(0)]);
    seed.owned.insert(UserIdx(3), vec![PieceIdx(1)]);

    let mut first = Iteration::new(1, 1);
    first.seen.insert(UserIdx(1), vec![seen(0, 0)]);
    first.propagated.insert(UserIdx(0), vec![PieceIdx(0)]);
    first.num_new_propagated = 1;
    first.total_propagated = 1;
    first.total_propagating_users = 1;

    let mut second = Iteration::new(2, 2);
    second.seen.insert(UserIdx(2), vec![seen(0, 1)]);
    second.propagated.insert(UserIdx(1), vec![PieceIdx(0)]);
    second.num_new_propagated = 1;
    second.total_propagated = 2;
    second.total_propagating_users = 2;

    let mut third = Iteration::new(3, 3);
    third.total_propagated = 2;
    third.total_propagating_users = 2;

    vec![seed, first, second, third]
}
