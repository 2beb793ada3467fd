#![allow(dead_code)]

use rgo_core::reference::{self, ChineseScorer, GoBoard};
use rgo_core::search::TimeManagement;
use rgo_core::{Board, Move, SearchConfig, SearchController};

pub type GoController =
    SearchController<GoBoard, rgo_core::policy::PolicyChain<GoBoard>, ChineseScorer>;

/// Single worker, playout cap, no clock: fully deterministic
pub fn capped_config(playouts: u64) -> SearchConfig {
    SearchConfig {
        threads: 1,
        msec: 0,
        playouts,
        table_size: 12,
        time_management: TimeManagement::Fixed,
        seed: 42,
        ..SearchConfig::default()
    }
}

pub fn controller(config: SearchConfig) -> GoController {
    let policy = reference::default_policy().expect("default pipeline");
    SearchController::new(GoBoard::new(5), policy, ChineseScorer::default(), config)
        .expect("valid config")
}

pub fn legal_moves(board: &GoBoard) -> Vec<Move> {
    let mut legal = Vec::new();
    board.legal_moves(&mut legal);
    legal
}
