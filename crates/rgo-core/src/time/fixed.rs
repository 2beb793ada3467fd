//! Fixed allocation: one slice per move

use super::{TimeManager, msec_per_move};
use crate::search::SearchConfig;
use crate::tt::RootSummary;

#[derive(Debug, Clone)]
pub struct FixedTimeManager {
    msec: u64,
    min_moves_left: u64,
    time_constant: f64,
    remaining_ms: Option<u64>,
    per_move_ms: u64,
    slice_used: bool,
}

impl FixedTimeManager {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            msec: config.msec,
            min_moves_left: config.min_moves_left,
            time_constant: config.time_constant,
            remaining_ms: None,
            per_move_ms: config.msec,
            slice_used: false,
        }
    }

    /// Budget computed by the last `start_turn`
    pub fn per_move_ms(&self) -> u64 {
        self.per_move_ms
    }
}

impl TimeManager for FixedTimeManager {
    fn set_remaining_seconds(&mut self, seconds: u64) {
        self.remaining_ms = Some(seconds.saturating_mul(1000));
    }

    fn start_turn(&mut self, legal_moves: usize) {
        self.per_move_ms = match self.remaining_ms {
            Some(remaining) => {
                msec_per_move(remaining, legal_moves, self.min_moves_left, self.time_constant)
            }
            None => self.msec,
        };
        self.slice_used = false;
    }

    fn next_slice_ms(&mut self, _summary: &RootSummary) -> u64 {
        if std::mem::replace(&mut self.slice_used, true) {
            0
        } else {
            self.per_move_ms
        }
    }

    fn is_unlimited(&self) -> bool {
        self.remaining_ms.is_none() && self.msec == 0
    }
}
