//! Monte Carlo move simulator for the crossword engine.
//!
//! Given a position and a set of candidate moves, the simulator estimates
//! each candidate's long-run value — expected point equity and win
//! probability — by playing out many randomized multi-ply continuations
//! and aggregating statistics.
//!
//! # Overview
//!
//! One *iteration* re-deals everything the player on move cannot see
//! (opponent racks, the bag's drawing order) and then runs one *rollout*
//! per included candidate: play the candidate, answer with the rules
//! engine's static best moves for the configured number of plies, and
//! score the resulting line. Per-ply scores land in a level grid, the
//! horizon is patched with rack-leave and board *residuals*, and the final
//! spread becomes a win indicator — exact when the game ended, otherwise a
//! heuristic estimate from the injected [`WinEstimator`].
//!
//! Aggregates are plain count/sum/sum-of-squares accumulators, so rollout
//! messages can be incorporated in any order; `simulate_parallel` exploits
//! this to fan iterations out across the rayon pool with per-iteration
//! random substreams.
//!
//! # Usage
//!
//! ```rust,ignore
//! use simulator::{LogisticWinEstimator, Simulator};
//!
//! let mut sim = Simulator::new(position, LogisticWinEstimator::new()).with_seed(42);
//! sim.prune_to(10.0, 12);
//! sim.simulate(2, 300)?;
//!
//! for mv in sim.moves(true, true) {
//!     println!("{mv}: equity {:.1}, win {:.1}%", mv.equity, mv.win * 100.0);
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Simulator ── randomize ──► origin position (racks + draw order re-dealt)
//!     │
//!     ├── per included candidate: RolloutEngine::run ──► SimmedMoveMessage
//!     │
//!     └── incorporate_message ──► SimmedMove { LevelGrid, residual,
//!                                              game spread, wins }
//! ```
//!
//! The game rules engine stays behind the `game_core::Position` capability
//! trait; tests drive the simulator with the deterministic `games-wordgrid`
//! collaborator.

pub mod config;
pub mod estimator;
pub mod logfile;
pub mod randomize;
pub mod rollout;
pub mod simmed_move;
pub mod simulator;
pub mod stats;

// Re-export main types
pub use config::SimSettings;
pub use estimator::{ConstantWinEstimator, LogisticWinEstimator, WinEstimator};
pub use logfile::XmlLog;
pub use rollout::{RolloutEngine, SimError};
pub use simmed_move::{SimmedMove, SimmedMoveMessage};
pub use simulator::{Dispatch, Simulator};
pub use stats::{AveragedValue, Level, LevelGrid, PositionStatistics};
