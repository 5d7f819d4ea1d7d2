//! Simulation settings.

use serde::Deserialize;

/// Tunable settings for a simulation run.
///
/// Deserializable so front ends can load them from configuration; every
/// field falls back to its default when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Opponents pass instead of playing their static best move.
    pub ignore_opponents: bool,

    /// Tiles known to be on every opponent's rack, as a letter string.
    pub partial_opponent_rack: String,

    /// Turns simulated after the candidate play. 0 plays the candidate
    /// alone; negative plays to the end of the game.
    pub plies: i32,

    /// Rollouts per candidate in one batch.
    pub iterations: u32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            ignore_opponents: false,
            partial_opponent_rack: String::new(),
            plies: 2,
            iterations: 300,
        }
    }
}

impl SimSettings {
    /// A fast configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            iterations: 5,
            ..Self::default()
        }
    }

    pub fn with_plies(mut self, plies: i32) -> Self {
        self.plies = plies;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_ignore_opponents(mut self, ignore: bool) -> Self {
        self.ignore_opponents = ignore;
        self
    }

    pub fn with_partial_rack(mut self, letters: &str) -> Self {
        self.partial_opponent_rack = letters.to_string();
        self
    }
}
