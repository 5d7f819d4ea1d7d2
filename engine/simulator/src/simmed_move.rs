//! One candidate under simulation.

use std::sync::atomic::{AtomicU64, Ordering};

use game_core::Move;

use crate::stats::{AveragedValue, LevelGrid, PositionStatistics};

/// Process-wide id source; ids stay unique across every simulator instance
/// in one process.
static NEXT_SIMMED_MOVE_ID: AtomicU64 = AtomicU64::new(0);

/// A candidate move plus everything the simulation has learned about it.
#[derive(Debug, Clone)]
pub struct SimmedMove {
    /// Unique, monotonically assigned id.
    pub id: u64,

    /// The candidate itself; its `equity` and `win` are the static
    /// estimates used before any simulation data exists.
    pub mv: Move,

    /// Whether rollouts currently evaluate this candidate.
    pub include_in_simulation: bool,

    /// Per-level, per-player score and bingo statistics.
    pub levels: LevelGrid,

    /// End-of-horizon rack/board considerations, signed by actor.
    pub residual: AveragedValue,

    /// Final spread relative to the player on move, per rollout.
    pub game_spread: AveragedValue,

    /// Win indicator (or heuristic win probability) per rollout.
    pub wins: AveragedValue,
}

impl SimmedMove {
    pub fn new(mv: Move) -> Self {
        Self {
            id: NEXT_SIMMED_MOVE_ID.fetch_add(1, Ordering::Relaxed),
            mv,
            include_in_simulation: true,
            levels: LevelGrid::new(),
            residual: AveragedValue::new(),
            game_spread: AveragedValue::new(),
            wins: AveragedValue::new(),
        }
    }

    /// Simulated equity: at each level the first slot's mean score counts
    /// for the candidate's player and every later slot counts against,
    /// then the mean residual is added. Falls back to the move's static
    /// equity when no simulation data exists.
    pub fn calculate_equity(&self) -> f64 {
        if self.levels.is_empty() {
            return self.mv.equity;
        }

        let mut equity = 0.0;
        for level in self.levels.iter() {
            for (slot, statistics) in level.statistics.iter().enumerate() {
                if slot == 0 {
                    equity += statistics.score.mean();
                } else {
                    equity -= statistics.score.mean();
                }
            }
        }
        equity + self.residual.mean()
    }

    /// Simulated win percentage, or the move's static estimate when no
    /// rollout has finished.
    pub fn calculate_win_percentage(&self) -> f64 {
        if self.wins.has_values() {
            self.wins.mean() * 100.0
        } else {
            self.mv.win
        }
    }

    /// Drop the per-ply statistics. The scalar aggregates are left alone;
    /// a full reset is the simulator's job.
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn position_statistics(&self, level: usize, player: usize) -> Option<&PositionStatistics> {
        self.levels.get(level)?.statistics.get(player)
    }
}

/// The result of one rollout of one candidate, handed back to the
/// simulator for incorporation.
///
/// `levels` holds exactly this rollout's samples (at most one per slot);
/// incorporation merges them into the candidate's grid, which makes the
/// order of incorporation irrelevant. `xml` carries the buffered per-ply
/// log elements when logging is enabled, so the log sink is only touched
/// from the incorporation path.
#[derive(Debug, Clone)]
pub struct SimmedMoveMessage {
    pub id: u64,
    pub levels: LevelGrid,
    pub residual: f64,
    pub game_spread: i32,
    pub wins: f64,
    pub bogowin: bool,
    pub xml: Option<String>,
}
