//! Confidence-based early exit

use log::debug;

use super::normal::normal_cdf;
use super::{TimeManager, msec_per_move};
use crate::search::SearchConfig;
use crate::tt::RootSummary;

/// Confidence (0.0..=1.0) that the best move's win rate is higher than the
/// pooled win rate of every other move
///
/// Unpooled two-proportion z-test. Never divides by zero:
/// - best move without runs: 0 (not confident)
/// - no runs on any other move: 1 (nothing to compare against)
/// - zero variance: 1 if the best rate is higher, otherwise 0
pub fn confidence(summary: &RootSummary) -> f64 {
    if summary.best_runs == 0 {
        return 0.0;
    }
    if summary.rest_runs == 0 {
        return 1.0;
    }
    let best_runs = summary.best_runs as f64;
    let rest_runs = summary.rest_runs as f64;
    let best = summary.best_wins as f64 / best_runs;
    let rest = summary.rest_wins as f64 / rest_runs;
    let denominator = (best * (1.0 - best) / best_runs + rest * (1.0 - rest) / rest_runs).sqrt();
    if denominator == 0.0 {
        return if best > rest { 1.0 } else { 0.0 };
    }
    normal_cdf((best - rest) / denominator)
}

#[derive(Debug, Clone)]
pub struct ExitingTimeManager {
    msec: u64,
    slices: u32,
    threshold: f64,
    min_moves_left: u64,
    time_constant: f64,
    reserve_ms: u64,
    remaining_ms: Option<u64>,
    rollover_ms: u64,
    msec_per_slice: u64,
    slices_remaining: u32,
}

impl ExitingTimeManager {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            msec: config.msec,
            slices: config.slices.max(1),
            threshold: config.confidence_threshold,
            min_moves_left: config.min_moves_left,
            time_constant: config.time_constant,
            reserve_ms: config.reserve_ms,
            remaining_ms: None,
            rollover_ms: 0,
            msec_per_slice: 0,
            slices_remaining: 0,
        }
    }

    pub fn msec_per_slice(&self) -> u64 {
        self.msec_per_slice
    }

    pub fn slices_remaining(&self) -> u32 {
        self.slices_remaining
    }
}

impl TimeManager for ExitingTimeManager {
    fn set_remaining_seconds(&mut self, seconds: u64) {
        self.remaining_ms = Some(seconds.saturating_mul(1000).saturating_sub(self.reserve_ms));
    }

    fn start_turn(&mut self, legal_moves: usize) {
        let per_move = match self.remaining_ms {
            Some(remaining) => {
                msec_per_move(remaining, legal_moves, self.min_moves_left, self.time_constant)
            }
            None => self.msec,
        };
        // the carried time is spent on this move unless it exits early again
        let budget = per_move + std::mem::take(&mut self.rollover_ms);
        self.msec_per_slice = (budget / u64::from(self.slices)).max(1);
        self.slices_remaining = self.slices;
        debug!(
            "time: {} slices of {} ms (per move {per_move} ms)",
            self.slices, self.msec_per_slice
        );
    }

    fn next_slice_ms(&mut self, summary: &RootSummary) -> u64 {
        if self.slices_remaining == 0 {
            self.rollover_ms = 0;
            return 0;
        }
        if self.slices_remaining < self.slices {
            let c = confidence(summary);
            debug!("time: best {} confidence {c:.4}", summary.best);
            if c > self.threshold {
                self.rollover_ms = u64::from(self.slices_remaining) * self.msec_per_slice;
                self.slices_remaining = 0;
                return 0;
            }
        }
        self.slices_remaining -= 1;
        self.msec_per_slice
    }

    fn rollover_ms(&self) -> u64 {
        self.rollover_ms
    }

    fn is_unlimited(&self) -> bool {
        self.remaining_ms.is_none() && self.msec == 0
    }
}
