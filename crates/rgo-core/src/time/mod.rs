//! Time management for the search controller
//!
//! The controller asks the manager for one slice at a time and runs the
//! workers for that long. A slice of 0 ms ends the search for this move.
//!
//! - `FixedTimeManager`: one slice per move, no early exit
//! - `ExitingTimeManager`: several slices, stops early once the best move is
//!   statistically dominant and rolls the unused time over to the next move

mod exiting;
mod fixed;
mod normal;


pub use exiting::{ExitingTimeManager, confidence};
pub use fixed::FixedTimeManager;
pub use normal::{erf, normal_cdf};

use crate::search::{SearchConfig, TimeManagement};
use crate::tt::RootSummary;

/// Slice-based time budget
pub trait TimeManager: Send {
    /// Clock time left for the rest of the game
    fn set_remaining_seconds(&mut self, seconds: u64);

    /// Called once per `best_move`, before the first slice
    fn start_turn(&mut self, legal_moves: usize);

    /// Length of the next slice in ms; 0 means stop now
    fn next_slice_ms(&mut self, summary: &RootSummary) -> u64;

    /// Time carried over into the next move, in ms
    fn rollover_ms(&self) -> u64 {
        0
    }

    /// No clock and no per-move budget: run until a playout cap or an external stop
    fn is_unlimited(&self) -> bool {
        false
    }
}

/// Build the manager selected by `config.time_management`
pub fn from_config(config: &SearchConfig) -> Box<dyn TimeManager> {
    match config.time_management {
        TimeManagement::Fixed => Box::new(FixedTimeManager::new(config)),
        TimeManagement::Exiting => Box::new(ExitingTimeManager::new(config)),
    }
}

/// Per-move budget shared by both managers
///
/// `remaining_ms / max(min_moves_left, legal_moves * time_constant)`, at least 1 ms.
pub(crate) fn msec_per_move(
    remaining_ms: u64,
    legal_moves: usize,
    min_moves_left: u64,
    time_constant: f64,
) -> u64 {
    let estimate = (legal_moves as f64 * time_constant) as u64;
    let moves_left = estimate.max(min_moves_left).max(1);
    (remaining_ms / moves_left).max(1)
}
