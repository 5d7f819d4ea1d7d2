//! Wordgrid: a deterministic rack-and-bag tile game.
//!
//! This crate provides a small but complete collaborator implementing the
//! `game_core::Position` capability set, so the simulator's tests and
//! benches can run against a real game without a full crossword rules
//! engine. There is no board geometry: a `Place` move commits tiles from
//! the rack for their summed point value, racks replenish from an explicit
//! drawing order, and the game ends when a player plays out with an empty
//! bag (or after a run of scoreless turns).
//!
//! Everything is deterministic given the racks, the bag's drawing order,
//! and the turn, which is exactly what fabricated test positions need.
//!
//! # Usage
//!
//! ```rust
//! use games_wordgrid::{scored_place, WordgridPosition};
//! use game_core::{tile::tiles_from_letters, Position};
//!
//! let position = WordgridPosition::builder()
//!     .player("ABCDE")
//!     .player("FGHIJ")
//!     .bag("KLMNOP")
//!     .candidate(scored_place(tiles_from_letters("AB")))
//!     .build();
//!
//! assert_eq!(position.players().len(), 2);
//! assert!(!position.game_over());
//! ```

use game_core::tile::tiles_from_letters;
use game_core::{Bag, GameError, Move, MoveKind, PlayerId, Position, Rack, Tile};


/// Rack capacity.
pub const RACK_SIZE: usize = 5;

/// Bonus for committing a full rack in one move.
pub const BINGO_BONUS: i32 = 25;

/// Consecutive scoreless turns that end the game.
pub const SCORELESS_LIMIT: u32 = 6;

/// Point value of one tile (standard crossword letter values; blanks are
/// worth nothing).
pub fn tile_value(tile: Tile) -> i32 {
    match tile.letter() {
        'A' | 'E' | 'I' | 'O' | 'U' | 'L' | 'N' | 'S' | 'T' | 'R' => 1,
        'D' | 'G' => 2,
        'B' | 'C' | 'M' | 'P' => 3,
        'F' | 'H' | 'V' | 'W' | 'Y' => 4,
        'K' => 5,
        'J' | 'X' => 8,
        'Q' | 'Z' => 10,
        _ => 0,
    }
}

/// Summed point value of a rack.
pub fn rack_value(rack: &Rack) -> i32 {
    rack.tiles().iter().copied().map(tile_value).sum()
}

/// Build a `Place` move scored by wordgrid rules: summed tile values, plus
/// the bingo bonus when the move commits a full rack.
pub fn scored_place(tiles: Vec<Tile>) -> Move {
    let is_bingo = tiles.len() == RACK_SIZE;
    let mut score: i32 = tiles.iter().copied().map(tile_value).sum();
    if is_bingo {
        score += BINGO_BONUS;
    }
    let equity = f64::from(score);
    Move::place(tiles, score)
        .with_bingo(is_bingo)
        .with_equity(equity)
}

#[derive(Debug, Clone)]
struct PlayerState {
    id: PlayerId,
    rack: Rack,
    score: i32,
}

/// One wordgrid position.
#[derive(Debug, Clone)]
pub struct WordgridPosition {
    players: Vec<PlayerState>,
    turn: usize,
    bag: Bag,
    played: Vec<Tile>,
    /// Full tile distribution at game start, sorted, for bag accounting.
    initial_tiles: Vec<Tile>,
    candidates: Vec<Move>,
    candidate: Option<Move>,
    scoreless_turns: u32,
    game_over: bool,
}

impl WordgridPosition {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// A player's current score.
    pub fn score(&self, player: PlayerId) -> i32 {
        self.player_state(player).score
    }

    fn player_index(&self, player: PlayerId) -> usize {
        self.players
            .iter()
            .position(|p| p.id == player)
            .expect("player id not in game")
    }

    fn player_state(&self, player: PlayerId) -> &PlayerState {
        &self.players[self.player_index(player)]
    }

    fn deadwood_against(&self, mover: usize) -> i32 {
        self.players
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != mover)
            .map(|(_, p)| rack_value(&p.rack))
            .sum()
    }

    /// Multiset of every tile currently in the position.
    fn all_tiles(&self) -> Vec<Tile> {
        let mut tiles: Vec<Tile> = self.bag.tiles().to_vec();
        tiles.extend_from_slice(&self.played);
        for player in &self.players {
            tiles.extend_from_slice(player.rack.tiles());
        }
        tiles.sort_unstable();
        tiles
    }
}

impl Position for WordgridPosition {
    fn current_player(&self) -> PlayerId {
        self.players[self.turn].id
    }

    fn players(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    fn moves(&self) -> &[Move] {
        &self.candidates
    }

    fn rack(&self, player: PlayerId) -> &Rack {
        &self.player_state(player).rack
    }

    fn rack_size(&self) -> usize {
        RACK_SIZE
    }

    fn bag(&self) -> &Bag {
        &self.bag
    }

    fn unseen_bag(&self) -> Bag {
        let mut tiles: Vec<Tile> = self.bag.tiles().to_vec();
        for (index, player) in self.players.iter().enumerate() {
            if index != self.turn {
                tiles.extend_from_slice(player.rack.tiles());
            }
        }
        Bag::from_tiles(tiles)
    }

    fn set_player_rack(
        &mut self,
        player: PlayerId,
        rack: Rack,
        adjust_bag: bool,
    ) -> Result<(), GameError> {
        let index = self.player_index(player);
        if adjust_bag {
            let current = self.current_player();
            let old = std::mem::take(&mut self.players[index].rack);
            for &tile in old.tiles() {
                self.bag.push(tile);
            }
            for &tile in rack.tiles() {
                if self.bag.remove_tiles(&[tile]).is_ok() {
                    continue;
                }
                // The bag does not hold it: the tile must be sitting on
                // another hidden rack. Take it from there.
                let stolen = self
                    .players
                    .iter_mut()
                    .enumerate()
                    .filter(|(other, p)| *other != index && p.id != current)
                    .any(|(_, p)| p.rack.remove(tile));
                if !stolen {
                    return Err(GameError::BagAccounting(format!(
                        "tile {tile} unavailable for rack swap"
                    )));
                }
            }
        }
        self.players[index].rack = rack;
        Ok(())
    }

    fn ensure_proper_bag(&self) -> Result<(), GameError> {
        let tiles = self.all_tiles();
        if tiles == self.initial_tiles {
            Ok(())
        } else {
            Err(GameError::BagAccounting(format!(
                "have {} tiles, started with {}",
                tiles.len(),
                self.initial_tiles.len()
            )))
        }
    }

    fn set_drawing_order(&mut self, order: Vec<Tile>) -> Result<(), GameError> {
        self.bag.set_order(order)
    }

    fn static_best_move(&self) -> Move {
        let rack = &self.players[self.turn].rack;
        // ties go to the earlier rack position
        let mut best: Option<Tile> = None;
        for &tile in rack.tiles() {
            if best.map_or(true, |b| tile_value(tile) > tile_value(b)) {
                best = Some(tile);
            }
        }
        match best {
            Some(tile) => scored_place(vec![tile]),
            None => Move::pass(),
        }
    }

    fn move_ends_game(&self, mv: &Move) -> bool {
        match &mv.kind {
            MoveKind::Place(tiles) => {
                self.bag.is_empty() && tiles.len() == self.players[self.turn].rack.len()
            }
            _ => false,
        }
    }

    fn deadwood(&self) -> i32 {
        self.deadwood_against(self.turn)
    }

    fn player_consideration(&self, mv: &Move) -> f64 {
        let mut leave = self.players[self.turn].rack.clone();
        for &tile in mv.tiles() {
            leave.remove(tile);
        }
        -f64::from(rack_value(&leave)) / 10.0
    }

    fn shared_consideration(&self, _mv: &Move) -> f64 {
        if self.bag.is_empty() {
            0.0
        } else {
            0.25
        }
    }

    fn spread(&self, player: PlayerId) -> i32 {
        let own = self.player_state(player).score;
        let best_other = self
            .players
            .iter()
            .filter(|p| p.id != player)
            .map(|p| p.score)
            .max()
            .unwrap_or(0);
        own - best_other
    }

    fn game_over(&self) -> bool {
        self.game_over
    }

    fn set_candidate(&mut self, mv: Move) {
        self.candidate = Some(mv);
    }

    fn commit_candidate(&mut self, maintain_board: bool) -> Result<(), GameError> {
        let mv = self.candidate.take().ok_or(GameError::NoCandidate)?;
        let ends_game = self.move_ends_game(&mv);
        let mover = self.turn;

        match &mv.kind {
            MoveKind::None | MoveKind::Pass => {
                self.scoreless_turns += 1;
            }
            MoveKind::Exchange(tiles) => {
                for &tile in tiles.iter() {
                    if !self.players[mover].rack.remove(tile) {
                        return Err(GameError::IllegalMove(format!(
                            "exchanged tile {tile} not on rack"
                        )));
                    }
                }
                let count = tiles.len();
                for _ in 0..count {
                    match self.bag.draw() {
                        Some(drawn) => self.players[mover].rack.push(drawn),
                        None => break,
                    }
                }
                for &tile in tiles.iter() {
                    self.bag.push_bottom(tile);
                }
                self.scoreless_turns += 1;
            }
            MoveKind::Place(tiles) => {
                for &tile in tiles.iter() {
                    if !self.players[mover].rack.remove(tile) {
                        return Err(GameError::IllegalMove(format!(
                            "placed tile {tile} not on rack"
                        )));
                    }
                }
                self.played.extend_from_slice(tiles);
                self.players[mover].score += mv.score;
                if mv.score > 0 {
                    self.scoreless_turns = 0;
                } else {
                    self.scoreless_turns += 1;
                }

                if ends_game {
                    let bonus = self.deadwood_against(mover);
                    self.players[mover].score += bonus;
                    self.game_over = true;
                    return Ok(());
                }

                while self.players[mover].rack.len() < RACK_SIZE {
                    match self.bag.draw() {
                        Some(drawn) => self.players[mover].rack.push(drawn),
                        None => break,
                    }
                }
            }
        }

        if maintain_board {
            self.ensure_proper_bag()?;
        }

        if self.scoreless_turns >= SCORELESS_LIMIT {
            self.game_over = true;
            return Ok(());
        }

        self.turn = (self.turn + 1) % self.players.len();
        Ok(())
    }
}

/// Builder for fabricated positions.
#[derive(Debug, Default)]
pub struct Builder {
    players: Vec<(Rack, i32)>,
    bag: Bag,
    played: Vec<Tile>,
    turn: usize,
    candidates: Vec<Move>,
}

impl Builder {
    /// Add a player with the given rack and a zero score.
    pub fn player(self, letters: &str) -> Self {
        self.player_with_score(letters, 0)
    }

    pub fn player_with_score(mut self, letters: &str, score: i32) -> Self {
        self.players.push((Rack::from_letters(letters), score));
        self
    }

    /// Bag contents; the front of the string is drawn first.
    pub fn bag(mut self, letters: &str) -> Self {
        let mut tiles = tiles_from_letters(letters);
        tiles.reverse();
        self.bag = Bag::from_tiles(tiles);
        self
    }

    /// Tiles already committed to the board.
    pub fn played(mut self, letters: &str) -> Self {
        self.played = tiles_from_letters(letters);
        self
    }

    pub fn turn(mut self, turn: usize) -> Self {
        self.turn = turn;
        self
    }

    pub fn candidate(mut self, mv: Move) -> Self {
        self.candidates.push(mv);
        self
    }

    pub fn candidates(mut self, moves: Vec<Move>) -> Self {
        self.candidates = moves;
        self
    }

    pub fn build(self) -> WordgridPosition {
        let players: Vec<PlayerState> = self
            .players
            .into_iter()
            .enumerate()
            .map(|(index, (rack, score))| PlayerState {
                id: PlayerId(index as u8),
                rack,
                score,
            })
            .collect();

        let mut initial_tiles: Vec<Tile> = self.bag.tiles().to_vec();
        initial_tiles.extend_from_slice(&self.played);
        for player in &players {
            initial_tiles.extend_from_slice(player.rack.tiles());
        }
        initial_tiles.sort_unstable();

        WordgridPosition {
            players,
            turn: self.turn,
            bag: self.bag,
            played: self.played,
            initial_tiles,
            candidates: self.candidates,
            candidate: None,
            scoreless_turns: 0,
            game_over: false,
        }
    }
}
