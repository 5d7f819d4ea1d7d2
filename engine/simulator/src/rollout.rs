//! One rollout: a single randomized play-out of one candidate.
//!
//! The engine clones the (already randomized) origin position, plays the
//! candidate, then best-moves — or passes, in ignore-opponents mode — for
//! the remaining plies, recording per-ply statistics as it goes. The
//! result is a [`SimmedMoveMessage`] carrying exactly this rollout's
//! samples; nothing is written into the candidate until the simulator
//! incorporates the message, so a collaborator failure mid-rollout leaves
//! every aggregate untouched.
//!
//! # Plies, levels, and slots
//!
//! The requested ply count excludes the candidate itself, so it is
//! incremented once. The total is then split into complete rotations of
//! all players ("levels") plus a trailing partial level:
//!
//! ```text
//! partial_turns = (plies + 1) % num_players
//! full_levels   = (plies + 1) / num_players
//! ```
//!
//! Player slots are 1-indexed within a level; the candidate is level 1,
//! slot 1. A player's *final* turn of the rollout contributes a rack-leave
//! consideration to the residual (signed by whether the actor is the
//! player on move), and the very last turn adds the shared board
//! consideration on top.

use thiserror::Error;
use tracing::trace;

use game_core::{GameError, Move, Position};

use crate::estimator::WinEstimator;
use crate::logfile::PlyElement;
use crate::simmed_move::{SimmedMove, SimmedMoveMessage};
use crate::stats::LevelGrid;

/// Errors that can occur while simulating.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("game collaborator error: {0}")]
    Game(#[from] GameError),
}

/// Negative ply counts mean "play to the end of the game", bounded here.
const UNBOUNDED_PLIES: i32 = 1000;

/// Executes rollouts against one randomized origin position.
pub struct RolloutEngine<'a, P: Position, W: WinEstimator + ?Sized> {
    origin: &'a P,
    estimator: &'a W,
    plies: i32,
    ignore_opponents: bool,
    log_plies: bool,
}

impl<'a, P: Position, W: WinEstimator + ?Sized> RolloutEngine<'a, P, W> {
    pub fn new(origin: &'a P, estimator: &'a W, plies: i32, ignore_opponents: bool) -> Self {
        Self {
            origin,
            estimator,
            plies,
            ignore_opponents,
            log_plies: false,
        }
    }

    /// Buffer `<ply>` log elements into the message.
    pub fn with_ply_log(mut self, enabled: bool) -> Self {
        self.log_plies = enabled;
        self
    }

    /// Play out one candidate and return its message.
    pub fn run(&self, candidate: &SimmedMove) -> Result<SimmedMoveMessage, SimError> {
        let mut game = self.origin.clone();
        let start_player = game.current_player();
        let num_players = game.players().len();

        let requested = if self.plies < 0 {
            UNBOUNDED_PLIES
        } else {
            self.plies
        };
        // the requested count does not include the candidate ply
        let total_plies = (requested + 1) as usize;

        let partial_turns = total_plies % num_players;
        let full_levels = total_plies / num_players;

        let mut levels = LevelGrid::new();
        levels.ensure_levels(full_levels + 1);

        let mut residual = 0.0;
        let mut xml = if self.log_plies {
            Some(String::new())
        } else {
            None
        };

        'levels: for level_number in 1..=full_levels + 1 {
            if game.game_over() {
                break;
            }

            let slots = if level_number == full_levels + 1 {
                partial_turns
            } else {
                num_players
            };
            if slots == 0 {
                continue;
            }

            let level = &mut levels[level_number - 1];
            level.ensure_players(slots);

            for player_number in 1..=slots {
                if game.game_over() {
                    break 'levels;
                }
                let player_id = game.current_player();

                let mut mv = if player_id == start_player && level_number == 1 {
                    candidate.mv.clone()
                } else if self.ignore_opponents && player_id != start_player {
                    Move::pass()
                } else {
                    game.static_best_move()
                };

                // Fold the end-of-game adjustment into the recorded score.
                let mut deadwood_score = 0;
                if game.move_ends_game(&mv) {
                    deadwood_score = game.deadwood();
                    mv.score += deadwood_score;
                }

                let slot = &mut level.statistics[player_number - 1];
                slot.score.incorporate(f64::from(mv.score));
                slot.bingos.incorporate(if mv.is_bingo { 1.0 } else { 0.0 });

                let mut ply_log = xml.as_ref().map(|_| {
                    let index = (level_number - 1) * num_players + player_number - 1;
                    PlyElement::new(index, game.rack(player_id).letters(), &mv)
                });

                // Will this player act again before the horizon?
                let is_final_turn_for_player = if level_number == full_levels {
                    player_number > partial_turns
                } else if level_number == full_levels + 1 {
                    player_number <= partial_turns
                } else {
                    false
                };

                let is_very_final_turn = (partial_turns == 0
                    && level_number == full_levels
                    && player_number == num_players)
                    || (level_number == full_levels + 1 && player_number == partial_turns);

                if is_final_turn_for_player
                    && !(self.ignore_opponents && player_id != start_player)
                {
                    let mut addend = game.player_consideration(&mv);
                    if let Some(ply) = ply_log.as_mut() {
                        ply.player_consideration(addend);
                    }

                    if is_very_final_turn {
                        let shared = game.shared_consideration(&mv);
                        if shared != 0.0 {
                            if let Some(ply) = ply_log.as_mut() {
                                ply.shared_consideration(shared);
                            }
                        }
                        addend += shared;
                    }

                    if player_id == start_player {
                        residual += addend;
                    } else {
                        residual -= addend;
                    }
                }

                // The commit recomputes the end-of-game adjustment, so take
                // it back out to avoid counting it twice.
                mv.score -= deadwood_score;
                game.set_candidate(mv);
                game.commit_candidate(!is_very_final_turn)?;

                if let (Some(buffer), Some(ply)) = (xml.as_mut(), ply_log.as_ref()) {
                    ply.render_into(buffer);
                }
            }
        }

        let spread = game.spread(start_player);
        let (wins, bogowin) = if game.game_over() {
            let wins = match spread.cmp(&0) {
                std::cmp::Ordering::Greater => 1.0,
                std::cmp::Ordering::Equal => 0.5,
                std::cmp::Ordering::Less => 0.0,
            };
            (wins, false)
        } else {
            let unseen_tiles = game.bag().len() + game.rack_size();
            let wins = if game.current_player() == start_player {
                self.estimator
                    .win_probability((f64::from(spread) + residual) as i32, unseen_tiles, 0)
            } else {
                1.0 - self.estimator.win_probability(
                    (-f64::from(spread) - residual) as i32,
                    unseen_tiles,
                    0,
                )
            };
            (wins, true)
        };

        trace!(
            candidate = %candidate.mv,
            spread,
            residual,
            wins,
            bogowin,
            "rollout complete"
        );

        Ok(SimmedMoveMessage {
            id: candidate.id,
            levels,
            residual,
            game_spread: spread,
            wins,
            bogowin,
            xml,
        })
    }
}
