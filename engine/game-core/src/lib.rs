//! Core vocabulary types and traits for the crossword game engine
//!
//! This crate provides the pieces every other engine crate speaks in:
//! - `Tile`, `Rack`, `Bag`: the physical material of the game
//! - `Move`, `MoveKind`, `MoveList`: candidate plays and their metadata
//! - `Position`: the capability trait a game-rules collaborator implements
//! - `GameError`: failures surfaced by a collaborator
//!
//! The Monte Carlo simulator consumes these types; it never reaches into a
//! collaborator's internals beyond the `Position` capability set.

pub mod bag;
pub mod error;
pub mod moves;
pub mod position;
pub mod rack;
pub mod tile;

// Re-export main types for convenience
pub use bag::Bag;
pub use error::GameError;
pub use moves::{sort_by_equity, sort_by_win, Move, MoveKind, MoveList};
pub use position::{PlayerId, Position};
pub use rack::Rack;
pub use tile::Tile;
