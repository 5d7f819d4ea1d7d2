//! Win-probability estimation for unfinished rollouts.
//!
//! When a rollout runs out of plies before the game ends, the simulator
//! asks an injected estimator how likely the leader is to convert the
//! current spread into a win. Production engines back this with a fitted
//! table; [`LogisticWinEstimator`] is a table-free default that behaves
//! sensibly everywhere.

/// Trait for win-probability services.
pub trait WinEstimator: Send + Sync {
    /// Probability in `[0, 1]` that the player on move wins from `spread`
    /// with `unseen_tiles` tiles unaccounted for. `ply` selects a
    /// table column where one exists; the simulator always passes 0.
    fn win_probability(&self, spread: i32, unseen_tiles: usize, ply: u32) -> f64;
}

/// Logistic estimator whose width scales with the unseen-tile count: a
/// spread of ±(30 + unseen) maps to roughly a 90%/10% win probability.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticWinEstimator;

impl LogisticWinEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl WinEstimator for LogisticWinEstimator {
    fn win_probability(&self, spread: i32, unseen_tiles: usize, _ply: u32) -> f64 {
        let width = -(30.0 + unseen_tiles as f64) / (1.0f64 / 0.9 - 1.0).ln();
        1.0 / (1.0 + (-f64::from(spread) / width).exp())
    }
}

/// Estimator that always answers the same probability. Useful for tests
/// that need hand-computable rollout results.
#[derive(Debug, Clone, Copy)]
pub struct ConstantWinEstimator(pub f64);

impl WinEstimator for ConstantWinEstimator {
    fn win_probability(&self, _spread: i32, _unseen_tiles: usize, _ply: u32) -> f64 {
        self.0
    }
}
