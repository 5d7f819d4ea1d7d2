//! Failures surfaced by a game-rules collaborator.

use thiserror::Error;

use crate::position::PlayerId;
use crate::tile::Tile;

/// Errors that can occur inside a game-rules collaborator.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("tile {0} is not in the bag")]
    TileNotInBag(Tile),

    #[error("drawing order mismatch: bag holds {expected:?}, order holds {got:?}")]
    OrderMismatch { expected: String, got: String },

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("no candidate move has been set")]
    NoCandidate,

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("bag accounting is inconsistent: {0}")]
    BagAccounting(String),
}
