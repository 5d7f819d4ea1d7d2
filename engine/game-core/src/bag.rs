//! The tile supply.
//!
//! The bag doubles as the future drawing order: the back of the internal
//! vector is the draw end, so installing an explicit order makes every
//! subsequent draw deterministic. Random operations take the caller's
//! `ChaCha20Rng` so a seeded game replays exactly.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::error::GameError;
use crate::rack::Rack;
use crate::tile::{tiles_from_letters, Tile};

/// The tile supply, with an explicit draw order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bag {
    tiles: Vec<Tile>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    /// Create a bag from a letter string; non-tile characters are skipped.
    pub fn from_letters(letters: &str) -> Self {
        Self {
            tiles: tiles_from_letters(letters),
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Return a tile to the supply.
    pub fn push(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    /// Return a tile to the bottom of the drawing order, so it is drawn
    /// last.
    pub fn push_bottom(&mut self, tile: Tile) {
        self.tiles.insert(0, tile);
    }

    /// Draw the next tile in the drawing order.
    pub fn draw(&mut self) -> Option<Tile> {
        self.tiles.pop()
    }

    /// Remove one occurrence of each tile in `tiles`.
    pub fn remove_tiles(&mut self, tiles: &[Tile]) -> Result<(), GameError> {
        for &tile in tiles {
            match self.tiles.iter().position(|&t| t == tile) {
                Some(index) => {
                    self.tiles.swap_remove(index);
                }
                None => return Err(GameError::TileNotInBag(tile)),
            }
        }
        Ok(())
    }

    /// Draw uniformly random tiles until `rack` holds `capacity` tiles or
    /// the bag is empty.
    pub fn refill(&mut self, rack: &mut Rack, capacity: usize, rng: &mut ChaCha20Rng) {
        while rack.len() < capacity && !self.tiles.is_empty() {
            let index = rng.gen_range(0..self.tiles.len());
            rack.push(self.tiles.swap_remove(index));
        }
    }

    /// A uniformly shuffled copy of the contents.
    pub fn shuffled_tiles(&self, rng: &mut ChaCha20Rng) -> Vec<Tile> {
        let mut tiles = self.tiles.clone();
        tiles.shuffle(rng);
        tiles
    }

    /// Install an explicit drawing order: the front of `order` is drawn
    /// first. `order` must be a permutation of the current contents.
    pub fn set_order(&mut self, mut order: Vec<Tile>) -> Result<(), GameError> {
        let mut expected = self.tiles.clone();
        let mut got = order.clone();
        expected.sort_unstable();
        got.sort_unstable();
        if expected != got {
            return Err(GameError::OrderMismatch {
                expected: expected.iter().map(|t| t.letter()).collect(),
                got: got.iter().map(|t| t.letter()).collect(),
            });
        }
        // draw() pops from the back
        order.reverse();
        self.tiles = order;
        Ok(())
    }
}
