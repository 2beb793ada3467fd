//! プレイアウトワーカー
//!
//! 1回のシミュレーション:
//! 1. 非公開の盤面をルート局面に戻す
//! 2. 置換表の中を `Descender` で降りる（木の中の手は超コウまで検査する `play`）
//! 3. 表に無い局面に出たらノードを1つ確保してつなぎ、プレイアウト方策で終局まで打つ
//! 4. 採点し、通った経路に実統計、その後の手順全体にRAVE統計を加える
//!
//! 持碁（勝者なし、または手数上限）は両者に半勝ちとして加える。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, warn};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::descender::{Descender, select_move};
use super::error::SearchError;
use super::stop::{PlayoutBudget, StopSignal};
use crate::board::{Board, PlayoutPolicy, Scorer};
use crate::tt::{Credit, NodeId, TranspositionTable};
use crate::types::{Color, Move};

/// 1局の手数上限（盤上の点の数に対する倍率）
pub const MAX_GAME_LENGTH_FACTOR: usize = 3;

/// ワーカー全員が共有する状態（1セッション分）
pub(crate) struct SharedSearch {
    pub table: Arc<TranspositionTable>,
    pub descender: Box<dyn Descender>,
    pub stop: Arc<StopSignal>,
    pub budget: Arc<PlayoutBudget>,
    /// プール枯渇の警告を1セッション1回に抑える
    exhausted_warned: AtomicBool,
}

impl SharedSearch {
    pub(crate) fn new(
        table: Arc<TranspositionTable>,
        descender: Box<dyn Descender>,
        stop: Arc<StopSignal>,
        budget: Arc<PlayoutBudget>,
    ) -> Self {
        Self {
            table,
            descender,
            stop,
            budget,
            exhausted_warned: AtomicBool::new(false),
        }
    }

    fn warn_exhausted(&self, what: &str) {
        if !self.exhausted_warned.swap(true, Ordering::Relaxed) {
            warn!(
                "{what} pool exhausted ({} live nodes); continuing with playout-only simulations",
                self.table.live_nodes()
            );
        }
    }
}

/// ワーカー終了時の報告
#[derive(Debug, Default)]
pub(crate) struct WorkerReport {
    pub playouts: u64,
    pub ties: u64,
    pub error: Option<SearchError>,
}

/// 1回のシミュレーションの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Win(Color),
    Tie,
}

/// パニックで抜けるワーカーが停止を要求し、待っているコントローラを起こす
struct StopOnPanic(Arc<StopSignal>);

impl Drop for StopOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.stop();
        }
    }
}

/// 木の中で通った1手
#[derive(Debug, Clone, Copy)]
pub(crate) struct PathStep {
    pub node: NodeId,
    pub mv: Move,
    pub color: Color,
    /// 手順（`moves`）の中での位置
    pub index: usize,
}

pub(crate) struct PlayoutWorker<B: Board, P: PlayoutPolicy<B>, S: Scorer<B>> {
    id: usize,
    shared: Arc<SharedSearch>,
    /// 探索開始局面（シミュレーションごとにここへ戻す）
    root: B,
    board: B,
    policy: P,
    scorer: S,
    rng: Xoshiro256PlusPlus,
    legal: Vec<Move>,
    path: Vec<PathStep>,
    moves: Vec<(Move, Color)>,
    seen: Vec<bool>,
}

/// ワーカーの乱数の種（設定の種・セッション番号・ワーカー番号から決める）
pub(crate) fn worker_seed(seed: u64, session: u64, worker: usize) -> u64 {
    seed ^ session.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (worker as u64).wrapping_mul(0xD1B5_4A32_D192_ED03)
}

impl<B: Board, P: PlayoutPolicy<B>, S: Scorer<B>> PlayoutWorker<B, P, S> {
    pub(crate) fn new(
        id: usize,
        shared: Arc<SharedSearch>,
        root: B,
        policy: P,
        scorer: S,
        seed: u64,
    ) -> Self {
        let board = root.clone();
        let points = board.point_count();
        Self {
            id,
            shared,
            root,
            board,
            policy,
            scorer,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            legal: Vec::with_capacity(points),
            path: Vec::new(),
            moves: Vec::with_capacity(points * MAX_GAME_LENGTH_FACTOR),
            seen: vec![false; points],
        }
    }

    /// 停止要求までシミュレーションを繰り返す
    pub(crate) fn run(mut self) -> WorkerReport {
        let _stop_on_panic = StopOnPanic(self.shared.stop.clone());
        let mut report = WorkerReport::default();
        while !self.shared.stop.is_stopped() {
            if !self.shared.budget.claim() {
                self.shared.stop.stop();
                break;
            }
            match self.simulate() {
                Ok(outcome) => {
                    report.playouts += 1;
                    if outcome == Outcome::Tie {
                        report.ties += 1;
                    }
                    if self.shared.budget.complete() {
                        self.shared.stop.stop();
                    }
                }
                Err(e) => {
                    error!("worker {}: {e}", self.id);
                    report.error = Some(e);
                    self.shared.stop.stop();
                    break;
                }
            }
        }
        report
    }

    /// 1回のシミュレーション
    pub(crate) fn simulate(&mut self) -> Result<Outcome, SearchError> {
        self.board.copy_data_from(&self.root);
        self.path.clear();
        self.moves.clear();
        let turn_limit = self.board.point_count() * MAX_GAME_LENGTH_FACTOR;

        self.descend(turn_limit);

        while !self.board.is_game_over() && self.board.turn() < turn_limit {
            let color = self.board.color_to_play();
            let mv = self.policy.select_and_play_one_move(&mut self.rng, &mut self.board)?;
            self.moves.push((mv, color));
        }
        let winner = if self.board.is_game_over() {
            self.scorer.winner(&self.board)
        } else {
            None
        };
        backpropagate(&self.shared.table, &self.path, &self.moves, winner, &mut self.seen);
        Ok(winner.map_or(Outcome::Tie, Outcome::Win))
    }

    /// 木の中を降りる。表に無い局面に出たら1つ確保して止まる
    fn descend(&mut self, turn_limit: usize) {
        let shared = &*self.shared;
        let table = &*shared.table;
        let Some(mut node) = table.find_or_allocate(self.board.fingerprint()) else {
            shared.warn_exhausted("node");
            return;
        };
        while !self.board.is_game_over() && self.board.turn() < turn_limit {
            self.legal.clear();
            self.board.legal_moves(&mut self.legal);
            let color = self.board.color_to_play();
            let search_node = table.node(node);
            let mv = loop {
                let mv = select_move(shared.descender.as_ref(), search_node, &self.legal);
                if mv.is_pass() {
                    self.board.pass();
                    break mv;
                }
                if self.board.play(mv).is_ok() {
                    break mv;
                }
                // 超コウなど、盤面の候補手に含まれていても打てない手
                search_node.exclude(mv);
            };
            self.path.push(PathStep {
                node,
                mv,
                color,
                index: self.moves.len(),
            });
            self.moves.push((mv, color));

            let fingerprint = self.board.fingerprint();
            if let Some(child) = table.find_if_present(fingerprint) {
                if !table.link_child(node, mv, child) {
                    shared.warn_exhausted("link");
                }
                node = child;
                continue;
            }
            match table.find_or_allocate(fingerprint) {
                Some(child) => {
                    if !table.link_child(node, mv, child) {
                        shared.warn_exhausted("link");
                    }
                }
                None => shared.warn_exhausted("node"),
            }
            return;
        }
    }
}

/// 1回分の結果を経路と手順に反映する
///
/// - 経路上の各ノード: 選んだ手の runs/wins
/// - 経路上の各ノード: そのノード以降に初めて現れた各点について、
///   そのノードの手番側が打っていれば rave_runs/rave_wins
///
/// `winner` が `None`（持碁）なら全ノードに半勝ち。
pub(crate) fn backpropagate(
    table: &TranspositionTable,
    path: &[PathStep],
    moves: &[(Move, Color)],
    winner: Option<Color>,
    seen: &mut [bool],
) {
    for step in path {
        let node = table.node(step.node);
        let win = match winner {
            Some(color) => Credit::from(color == step.color),
            None => Credit::Tie,
        };
        node.record_run(step.mv, win);

        seen.fill(false);
        for &(mv, color) in &moves[step.index..] {
            let Some(point) = mv.to_point() else { continue };
            let Some(first) = seen.get_mut(point) else { continue };
            if std::mem::replace(first, true) {
                continue;
            }
            if color == step.color {
                node.record_rave(mv, win);
            }
        }
    }
}
