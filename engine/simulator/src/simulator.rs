//! The simulation orchestrator.
//!
//! A [`Simulator`] owns the original position, the candidate set, and the
//! aggregates. Each iteration re-deals the hidden information, rolls out
//! every included candidate through a [`RolloutEngine`], and folds the
//! resulting messages back in. All candidate bookkeeping — inclusion,
//! considered moves, pruning — lives here too.

use std::io::Write;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::{debug, error};

use game_core::{sort_by_equity, sort_by_win, Move, MoveList, Position, Rack};

use crate::config::SimSettings;
use crate::estimator::WinEstimator;
use crate::logfile::XmlLog;
use crate::randomize::{randomize_drawing_order, randomize_opponent_racks};
use crate::rollout::{RolloutEngine, SimError};
use crate::simmed_move::{SimmedMove, SimmedMoveMessage};

/// Cancellation hook consulted at iteration boundaries.
pub trait Dispatch: Send + Sync {
    fn should_abort(&self) -> bool;
}

impl<F> Dispatch for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn should_abort(&self) -> bool {
        self()
    }
}

/// Monte Carlo simulator for one position's candidate moves.
pub struct Simulator<P: Position, W: WinEstimator> {
    original: P,
    estimator: W,
    considered_moves: MoveList,
    simmed_moves: Vec<SimmedMove>,
    iterations: u64,
    partial_opponent_rack: Rack,
    ignore_opponents: bool,
    dispatch: Option<Box<dyn Dispatch>>,
    log: Option<XmlLog>,
    rng: ChaCha20Rng,
}

impl<P: Position, W: WinEstimator> Simulator<P, W> {
    /// Create a simulator over `position`'s candidate list. The random
    /// source is entropy-seeded; use [`Simulator::with_seed`] for
    /// reproducible runs.
    pub fn new(position: P, estimator: W) -> Self {
        let simmed_moves = position
            .moves()
            .iter()
            .cloned()
            .map(SimmedMove::new)
            .collect();
        Self {
            original: position,
            estimator,
            considered_moves: MoveList::new(),
            simmed_moves,
            iterations: 0,
            partial_opponent_rack: Rack::new(),
            ignore_opponents: false,
            dispatch: None,
            log: None,
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Seed the random source for deterministic rollouts.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
        self
    }

    // ── position & configuration ────────────────────────────────────

    /// Replace the position under simulation. Rebuilds the candidate set
    /// from the position's move list and resets every aggregate; an open
    /// log document is finished first.
    pub fn set_position(&mut self, position: P) {
        if self.has_simulation_results() {
            if let Some(log) = self.log.as_mut() {
                log.write_footer();
            }
        }
        self.simmed_moves = position
            .moves()
            .iter()
            .cloned()
            .map(SimmedMove::new)
            .collect();
        self.original = position;
        self.considered_moves.clear();
        self.reset_numbers();
    }

    pub fn position(&self) -> &P {
        &self.original
    }

    pub fn set_partial_opponent_rack(&mut self, rack: Rack) {
        self.partial_opponent_rack = rack;
    }

    pub fn partial_opponent_rack(&self) -> &Rack {
        &self.partial_opponent_rack
    }

    pub fn set_ignore_opponents(&mut self, ignore: bool) {
        self.ignore_opponents = ignore;
    }

    pub fn ignore_opponents(&self) -> bool {
        self.ignore_opponents
    }

    pub fn set_dispatch(&mut self, dispatch: Box<dyn Dispatch>) {
        self.dispatch = Some(dispatch);
    }

    pub fn clear_dispatch(&mut self) {
        self.dispatch = None;
    }

    /// Install settings loaded from configuration.
    pub fn apply_settings(&mut self, settings: &SimSettings) {
        self.ignore_opponents = settings.ignore_opponents;
        self.partial_opponent_rack = Rack::from_letters(&settings.partial_opponent_rack);
    }

    // ── logging ─────────────────────────────────────────────────────

    /// Open an XML log file. On failure the error is reported and the
    /// simulation proceeds with logging disabled.
    pub fn set_logfile(&mut self, path: impl AsRef<Path>, append: bool) {
        self.close_log();
        match XmlLog::to_file(path.as_ref(), append) {
            Ok(log) => self.log = Some(log),
            Err(err) => {
                error!(
                    path = %path.as_ref().display(),
                    %err,
                    "could not open simulation log; logging disabled"
                );
            }
        }
    }

    /// Log into an arbitrary sink (used by tests).
    pub fn set_log_writer(&mut self, writer: Box<dyn Write + Send>) {
        self.close_log();
        self.log = Some(XmlLog::new(writer));
    }

    /// Finish and drop the log document.
    pub fn close_log(&mut self) {
        if let Some(mut log) = self.log.take() {
            log.close();
        }
    }

    pub fn is_logging(&self) -> bool {
        self.log.is_some()
    }

    // ── candidate management ────────────────────────────────────────

    pub fn simmed_moves(&self) -> &[SimmedMove] {
        &self.simmed_moves
    }

    /// Mark exactly `moves` as included; anything not already a candidate
    /// is appended as a fresh one.
    pub fn set_included_moves(&mut self, moves: &[Move]) {
        for simmed in &mut self.simmed_moves {
            simmed.include_in_simulation = false;
        }
        for mv in moves {
            match self.simmed_moves.iter_mut().find(|s| &s.mv == mv) {
                Some(simmed) => simmed.include_in_simulation = true,
                None => self.simmed_moves.push(SimmedMove::new(mv.clone())),
            }
        }
    }

    pub fn add_considered_move(&mut self, mv: Move) {
        self.considered_moves.push(mv);
    }

    pub fn is_considered_move(&self, mv: &Move) -> bool {
        self.considered_moves.contains(mv)
    }

    pub fn considered_moves(&self) -> &[Move] {
        &self.considered_moves
    }

    /// Union the pruned-and-win-sorted candidate list with every
    /// considered move, so pruning can never drop a move the user singled
    /// out.
    pub fn make_sure_considered_moves_are_included(&mut self) {
        let mut superset = self.moves(true, true);
        for mv in &self.considered_moves {
            if !superset.contains(mv) {
                superset.push(mv.clone());
            }
        }
        self.set_included_moves(&superset);
    }

    /// Stable reorder promoting considered moves to the front of `list`,
    /// keeping the relative order within both groups.
    pub fn move_considered_moves_to_beginning(&self, list: &mut MoveList) {
        let (mut considered, others): (MoveList, MoveList) = list
            .drain(..)
            .partition(|mv| self.is_considered_move(mv));
        considered.extend(others);
        *list = considered;
    }

    /// Keep at most `max_moves` included candidates whose equity is within
    /// `equity_threshold` of the best one. A no-op when nothing is
    /// included.
    pub fn prune_to(&mut self, equity_threshold: f64, max_moves: usize) {
        let ranked = self.moves(true, false);
        let Some(top) = ranked.first() else {
            return;
        };
        let cutoff = top.equity - equity_threshold;
        let keep: MoveList = ranked
            .iter()
            .take(max_moves)
            .filter(|mv| mv.equity >= cutoff)
            .cloned()
            .collect();
        self.set_included_moves(&keep);
    }

    /// Throw away every statistic and start counting iterations from
    /// zero.
    pub fn reset_numbers(&mut self) {
        for simmed in &mut self.simmed_moves {
            simmed.clear();
            simmed.residual.clear();
            simmed.game_spread.clear();
            simmed.wins.clear();
        }
        self.iterations = 0;
    }

    // ── simulation ──────────────────────────────────────────────────

    fn should_abort(&self) -> bool {
        self.dispatch.as_ref().map_or(false, |d| d.should_abort())
    }

    /// Run one iteration: re-deal the hidden information on the original
    /// position, then roll out every included candidate at `plies` depth.
    ///
    /// `plies` counts the turns after the candidate play: 0 simulates the
    /// candidate alone, negative plays to the end of the game. With no
    /// included candidate this still counts an iteration and produces no
    /// messages.
    pub fn simulate_once(&mut self, plies: i32) -> Result<(), SimError> {
        self.iterations += 1;

        randomize_opponent_racks(
            &mut self.original,
            &self.partial_opponent_rack,
            &mut self.rng,
        )?;
        randomize_drawing_order(&mut self.original, &mut self.rng)?;

        if let Some(log) = self.log.as_mut() {
            log.begin_iteration(self.iterations);
        }
        let log_plies = self.log.is_some();

        let mut outcome = Ok(());
        for index in 0..self.simmed_moves.len() {
            if !self.simmed_moves[index].include_in_simulation {
                continue;
            }
            let result = {
                let engine = RolloutEngine::new(
                    &self.original,
                    &self.estimator,
                    plies,
                    self.ignore_opponents,
                )
                .with_ply_log(log_plies);
                engine.run(&self.simmed_moves[index])
            };
            match result {
                Ok(message) => self.incorporate_message(message),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }

        if let Some(log) = self.log.as_mut() {
            log.end_iteration();
        }
        outcome
    }

    /// Run a batch of iterations, checking the dispatch at every
    /// iteration boundary.
    pub fn simulate(&mut self, plies: i32, iterations: u32) -> Result<(), SimError> {
        for _ in 0..iterations {
            if self.should_abort() {
                debug!(completed = self.iterations, "simulation batch aborted");
                break;
            }
            self.simulate_once(plies)?;
        }
        Ok(())
    }

    /// Run a batch of iterations on the rayon pool.
    ///
    /// Each iteration randomizes its own clone of the original position
    /// with an independent substream seeded from the master RNG, so the
    /// aggregates come out identical regardless of which worker finishes
    /// first. Messages are incorporated serially in iteration order; the
    /// dispatch is only consulted before the fan-out.
    pub fn simulate_parallel(&mut self, plies: i32, iterations: u32) -> Result<(), SimError> {
        if iterations == 0 || self.should_abort() {
            return Ok(());
        }
        let seeds: Vec<u64> = (0..iterations).map(|_| self.rng.gen()).collect();

        let results: Vec<Result<Vec<SimmedMoveMessage>, SimError>> = {
            let origin = &self.original;
            let estimator = &self.estimator;
            let partial = self.partial_opponent_rack.clone();
            let ignore = self.ignore_opponents;
            let log_plies = self.log.is_some();
            let included: Vec<&SimmedMove> = self
                .simmed_moves
                .iter()
                .filter(|m| m.include_in_simulation)
                .collect();

            seeds
                .into_par_iter()
                .map(|seed| -> Result<Vec<SimmedMoveMessage>, SimError> {
                    let mut rng = ChaCha20Rng::seed_from_u64(seed);
                    let mut position = origin.clone();
                    randomize_opponent_racks(&mut position, &partial, &mut rng)?;
                    randomize_drawing_order(&mut position, &mut rng)?;

                    let engine = RolloutEngine::new(&position, estimator, plies, ignore)
                        .with_ply_log(log_plies);
                    included
                        .iter()
                        .map(|candidate| engine.run(candidate))
                        .collect()
                })
                .collect()
        };

        for batch in results {
            let batch = batch?;
            self.iterations += 1;
            if let Some(log) = self.log.as_mut() {
                log.begin_iteration(self.iterations);
            }
            for message in batch {
                self.incorporate_message(message);
            }
            if let Some(log) = self.log.as_mut() {
                log.end_iteration();
            }
        }
        Ok(())
    }

    /// Fold one rollout's result into its candidate and write its log
    /// element. Messages may arrive in any order; every aggregate is a
    /// plain sum.
    pub fn incorporate_message(&mut self, message: SimmedMoveMessage) {
        let Some(simmed) = self.simmed_moves.iter_mut().find(|m| m.id == message.id) else {
            debug!(id = message.id, "message for unknown candidate dropped");
            return;
        };
        simmed.levels.merge(&message.levels);
        simmed.residual.incorporate(message.residual);
        simmed.game_spread.incorporate(f64::from(message.game_spread));
        simmed.wins.incorporate(message.wins);

        if let Some(log) = self.log.as_mut() {
            let gameover_win = (!message.bogowin).then_some(message.wins);
            log.playahead(message.xml.as_deref().unwrap_or(""), gameover_win);
        }
    }

    // ── reading results ─────────────────────────────────────────────

    /// Completed iterations since the last reset.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Whether any candidate carries simulation data.
    pub fn has_simulation_results(&self) -> bool {
        self.simmed_moves.iter().any(|m| !m.levels.is_empty())
    }

    /// Current candidate list as moves. With `prune`, skip non-included
    /// candidates. Simulated equity and win probability overwrite the
    /// static estimates once any data exists; the list sorts by win when
    /// `by_win` and data exist, by equity otherwise.
    pub fn moves(&self, prune: bool, by_win: bool) -> MoveList {
        let use_simulated = self.has_simulation_results();
        let mut list: MoveList = self
            .simmed_moves
            .iter()
            .filter(|m| !prune || m.include_in_simulation)
            .map(|m| {
                let mut mv = m.mv.clone();
                if use_simulated {
                    mv.equity = m.calculate_equity();
                    mv.win = m.wins.mean();
                }
                mv
            })
            .collect();

        if by_win && use_simulated {
            sort_by_win(&mut list);
        } else {
            sort_by_equity(&mut list);
        }
        list
    }

    /// Look up the candidate for `mv`. On a miss the last candidate is
    /// returned (historical contract); `None` only when there are no
    /// candidates at all.
    pub fn simmed_move_for_move(&self, mv: &Move) -> Option<&SimmedMove> {
        self.simmed_moves
            .iter()
            .find(|m| &m.mv == mv)
            .or_else(|| self.simmed_moves.last())
    }

    pub fn num_levels(&self) -> usize {
        self.simmed_moves.first().map_or(0, |m| m.levels.len())
    }

    pub fn num_players_at_level(&self, level: usize) -> usize {
        self.simmed_moves
            .first()
            .and_then(|m| m.levels.get(level))
            .map_or(0, |l| l.statistics.len())
    }
}

#[cfg(test)]
#[path = "simulator_tests.rs"]
mod tests;
