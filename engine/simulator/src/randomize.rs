//! Hidden-information reshuffling before each rollout.
//!
//! Opponent racks and the bag's draw order are unknown to the player on
//! move, so every iteration re-deals them from the unseen-tile pool before
//! play-out. A partial opponent rack (tiles the caller knows the opponent
//! kept) constrains the deal.

use rand_chacha::ChaCha20Rng;
use tracing::trace;

use game_core::{GameError, Position, Rack};

/// Re-deal every opponent's rack from the unseen tiles.
///
/// Each opponent's rack starts from `partial`, which is removed from the
/// working pool so the random refill cannot hand the known tiles out
/// twice. The position's own bag accounting is verified before and after
/// the swap.
pub fn randomize_opponent_racks<P: Position>(
    position: &mut P,
    partial: &Rack,
    rng: &mut ChaCha20Rng,
) -> Result<(), GameError> {
    position.ensure_proper_bag()?;

    let mut pool = position.unseen_bag();
    let current = position.current_player();
    let rack_size = position.rack_size();

    for player in position.players() {
        if player == current {
            continue;
        }

        let mut rack = partial.clone();
        pool.remove_tiles(rack.tiles())?;
        pool.refill(&mut rack, rack_size, rng);
        trace!(%player, rack = %rack, "re-dealt opponent rack");
        position.set_player_rack(player, rack, true)?;
    }

    position.ensure_proper_bag()
}

/// Install a uniformly shuffled permutation of the bag as the future
/// drawing order.
pub fn randomize_drawing_order<P: Position>(
    position: &mut P,
    rng: &mut ChaCha20Rng,
) -> Result<(), GameError> {
    let order = position.bag().shuffled_tiles(rng);
    position.set_drawing_order(order)
}
