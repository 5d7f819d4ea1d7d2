//! The capability trait a game-rules collaborator implements.
//!
//! The Monte Carlo simulator treats the rules engine as an opaque
//! collaborator reachable only through this capability set. Cloning a
//! `Position` must be cheap enough to do once per rollout; implementations
//! with heavy state should share structure internally.

use std::fmt;

use crate::bag::Bag;
use crate::error::GameError;
use crate::moves::Move;
use crate::rack::Rack;
use crate::tile::Tile;

/// Stable player identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One game position plus the operations the simulator needs from it.
///
/// Mutating operations return `Result` so collaborator failures propagate
/// to the simulator instead of being swallowed. Lookups by `PlayerId` may
/// panic on ids the position never issued; the simulator only ever passes
/// ids obtained from `players()` or `current_player()`.
pub trait Position: Clone + Send + Sync {
    /// The player to move.
    fn current_player(&self) -> PlayerId;

    /// All players in turn order.
    fn players(&self) -> Vec<PlayerId>;

    /// The candidate moves attached to this position.
    fn moves(&self) -> &[Move];

    /// A player's rack.
    fn rack(&self, player: PlayerId) -> &Rack;

    /// The rack capacity of this game.
    fn rack_size(&self) -> usize;

    /// The tile supply.
    fn bag(&self) -> &Bag;

    /// The tiles unknown to the player to move: the bag plus every
    /// opponent's rack.
    fn unseen_bag(&self) -> Bag;

    /// Install `rack` on `player`. With `adjust_bag`, the old rack returns
    /// to the bag and the new rack's tiles are taken from it (stealing from
    /// other opponents' racks when the bag itself does not hold a tile).
    fn set_player_rack(
        &mut self,
        player: PlayerId,
        rack: Rack,
        adjust_bag: bool,
    ) -> Result<(), GameError>;

    /// Verify the position's tile accounting.
    fn ensure_proper_bag(&self) -> Result<(), GameError>;

    /// Install the future drawing order; must be a permutation of the bag.
    fn set_drawing_order(&mut self, order: Vec<Tile>) -> Result<(), GameError>;

    /// The rules engine's one-ply heuristic best move for the player to
    /// move. Deterministic for a given position.
    fn static_best_move(&self) -> Move;

    /// Whether committing `mv` would end the game.
    fn move_ends_game(&self, mv: &Move) -> bool;

    /// The end-of-game score adjustment the player to move would collect
    /// for opponents' leftover tiles.
    fn deadwood(&self) -> i32;

    /// Rack-leave value of the mover's rack after `mv`.
    fn player_consideration(&self, mv: &Move) -> f64;

    /// Board-state value beyond raw score after `mv`.
    fn shared_consideration(&self, mv: &Move) -> f64;

    /// Score difference from `player`'s perspective against the best
    /// opponent.
    fn spread(&self, player: PlayerId) -> i32;

    fn game_over(&self) -> bool;

    /// Stage a move for committing.
    fn set_candidate(&mut self, mv: Move);

    /// Commit the staged candidate: score it, apply end-of-game
    /// adjustments, replenish the rack, advance the turn. When
    /// `maintain_board` is false the position may relax bookkeeping that
    /// only matters for further play.
    fn commit_candidate(&mut self, maintain_board: bool) -> Result<(), GameError>;
}
