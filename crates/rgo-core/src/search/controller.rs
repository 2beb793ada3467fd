//! 探索コントローラ
//!
//! 1手ごとに N 個のワーカーを起動し、時間管理が返すスライスの間だけ走らせ、
//! 全員を join してからルートの統計で手を決める。
//! 着手を受け付けると新しいルートから mark して sweep し、木を次の手へ持ち越す。
//! ポンダー有効時は、着手を受け付けた直後から次の `best_move` / `accept_move` /
//! `undo` までワーカーを走らせ続ける。

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::config::{DescenderKind, SearchConfig};
use super::descender::{Descender, RaveDescender, UctDescender};
use super::error::{ConfigError, SearchError};
use super::stop::{PlayoutBudget, StopHandle, StopSignal};
use super::worker::{PlayoutWorker, SharedSearch, WorkerReport, worker_seed};
use crate::board::{Board, PlayoutPolicy, Scorer};
use crate::time::{self, TimeManager};
use crate::tt::{MoveReport, RootSummary, TranspositionTable};
use crate::types::{Legality, Move};

/// 投了を検討する最小の試行数
pub const RESIGN_MIN_RUNS: u32 = 100;

const FIRST_PLAYOUT_POLL_MS: u64 = 1;

/// 1セッション分の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub playouts: u64,
    pub ties: u64,
}

impl SessionStats {
    fn add(&mut self, report: &WorkerReport) {
        self.playouts += report.playouts;
        self.ties += report.ties;
    }
}

/// 探索コントローラ
pub struct SearchController<B, P, S>
where
    B: Board,
    P: PlayoutPolicy<B>,
    S: Scorer<B>,
{
    config: SearchConfig,
    /// 対局開始局面（`undo` はここから再生する）
    initial: B,
    board: B,
    history: Vec<Move>,
    table: Arc<TranspositionTable>,
    policy: P,
    scorer: S,
    time: Box<dyn TimeManager>,
    remaining_seconds: Option<u64>,
    stop: Arc<StopSignal>,
    budget: Arc<PlayoutBudget>,
    workers: Vec<JoinHandle<WorkerReport>>,
    session: u64,
    pondering: bool,
    /// ポンダー中に起きた失敗。次の `best_move` で返す
    pending_error: Option<SearchError>,
    last_stats: SessionStats,
}

fn build_table(config: &SearchConfig, point_count: usize) -> TranspositionTable {
    TranspositionTable::new(config.slot_count(), point_count, config.link_capacity())
}

fn time_settings_changed(a: &SearchConfig, b: &SearchConfig) -> bool {
    a.msec != b.msec
        || a.time_management != b.time_management
        || a.slices != b.slices
        || a.confidence_threshold != b.confidence_threshold
        || a.time_constant != b.time_constant
        || a.min_moves_left != b.min_moves_left
        || a.reserve_ms != b.reserve_ms
}

impl<B, P, S> SearchController<B, P, S>
where
    B: Board,
    P: PlayoutPolicy<B>,
    S: Scorer<B>,
{
    /// `board` を開始局面とするコントローラを作る
    pub fn new(board: B, policy: P, scorer: S, config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = Arc::new(build_table(&config, board.point_count()));
        let time = time::from_config(&config);
        Ok(Self {
            initial: board.clone(),
            board,
            history: Vec::new(),
            table,
            policy,
            scorer,
            time,
            remaining_seconds: None,
            stop: Arc::new(StopSignal::new()),
            budget: Arc::new(PlayoutBudget::default()),
            workers: Vec::new(),
            session: 0,
            pondering: false,
            pending_error: None,
            last_stats: SessionStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// 現在の局面
    pub fn board(&self) -> &B {
        &self.board
    }

    /// 受け付けた手の列
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn table(&self) -> &TranspositionTable {
        &self.table
    }

    pub fn is_pondering(&self) -> bool {
        self.pondering
    }

    /// 別スレッドから探索を止めるハンドル
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.stop.clone())
    }

    /// 直近のセッションで完了したシミュレーション数
    pub fn playouts_completed(&self) -> u64 {
        self.budget.completed()
    }

    /// 直近の `best_move` の集計
    pub fn last_stats(&self) -> SessionStats {
        self.last_stats
    }

    pub fn rollover_ms(&self) -> u64 {
        self.time.rollover_ms()
    }

    fn legal_moves(&self) -> Vec<Move> {
        let mut legal = Vec::with_capacity(self.board.point_count());
        self.board.legal_moves(&mut legal);
        legal
    }

    /// 現局面のルートの集計
    pub fn root_summary(&self) -> RootSummary {
        self.summarize(&self.legal_moves())
    }

    fn summarize(&self, legal: &[Move]) -> RootSummary {
        match self.table.find_if_present(self.board.fingerprint()) {
            Some(root) => self.table.node(root).summarize(legal),
            None => RootSummary::empty(legal.len()),
        }
    }

    /// 現局面のルートで試行の多い手
    pub fn root_report(&self, limit: usize) -> Vec<MoveReport> {
        self.table
            .find_if_present(self.board.fingerprint())
            .map(|root| self.table.node(root).report(limit))
            .unwrap_or_default()
    }

    fn descender(&self) -> Box<dyn Descender> {
        match self.config.descender {
            DescenderKind::Rave => {
                Box::new(RaveDescender::new(self.config.rave_bias, self.config.exploration))
            }
            DescenderKind::Uct => Box::new(UctDescender::new(self.config.uct_exploration)),
        }
    }

    // ----- workers -----

    fn start_workers(&mut self) -> Result<(), SearchError> {
        debug_assert!(self.workers.is_empty());
        self.session += 1;
        self.stop.reset();
        self.budget.reset(self.config.playouts);
        let shared = Arc::new(SharedSearch::new(
            self.table.clone(),
            self.descender(),
            self.stop.clone(),
            self.budget.clone(),
        ));
        for id in 0..self.config.threads {
            let worker = PlayoutWorker::new(
                id,
                shared.clone(),
                self.board.clone(),
                self.policy.clone(),
                self.scorer.clone(),
                worker_seed(self.config.seed, self.session, id),
            );
            let spawned = thread::Builder::new()
                .name(format!("rgo-worker-{id}"))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    self.stop.stop();
                    if let Err(join_error) = self.join_workers() {
                        warn!("while aborting session {}: {join_error}", self.session);
                    }
                    return Err(SearchError::WorkerSpawn(e));
                }
            }
        }
        debug!(
            "session {} started: {} workers, {} live nodes",
            self.session,
            self.workers.len(),
            self.table.live_nodes()
        );
        Ok(())
    }

    /// 全ワーカーを join する。失敗があれば最初のものを返す（join は全員分行う）
    fn join_workers(&mut self) -> Result<SessionStats, SearchError> {
        let mut stats = SessionStats::default();
        let mut first_error = None;
        for (id, handle) in self.workers.drain(..).enumerate() {
            match handle.join() {
                Ok(report) => {
                    stats.add(&report);
                    if let Some(e) = report.error {
                        first_error.get_or_insert(e);
                    }
                }
                Err(_) => {
                    warn!("search worker {id} panicked");
                    first_error.get_or_insert(SearchError::WorkerPanicked { worker: id });
                }
            }
        }
        self.pondering = false;
        debug!(
            "session {} stopped: {} playouts, {} ties",
            self.session, stats.playouts, stats.ties
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    fn stop_workers(&mut self) -> Result<SessionStats, SearchError> {
        if self.workers.is_empty() {
            return Ok(SessionStats::default());
        }
        self.stop.stop();
        self.join_workers()
    }

    fn stop_ponder(&mut self) {
        if let Err(e) = self.stop_workers() {
            self.pending_error.get_or_insert(e);
        }
    }

    fn restart_ponder(&mut self) {
        if !self.config.ponder || self.board.is_game_over() {
            return;
        }
        match self.start_workers() {
            Ok(()) => self.pondering = true,
            Err(e) => {
                error!("failed to start pondering: {e}");
                self.pending_error.get_or_insert(e);
            }
        }
    }

    // ----- search -----

    /// 現局面で探索し、推奨手を返す
    ///
    /// 投了すべきときは `Move::RESIGN`。プレイアウト方策の契約違反は
    /// `SearchError::IllegalPlayoutMove` として返る。
    pub fn best_move(&mut self) -> Result<Move, SearchError> {
        self.stop_ponder();
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }
        let legal = self.legal_moves();
        let started = Instant::now();
        self.time.start_turn(legal.len());
        self.start_workers()?;

        if self.time.is_unlimited() {
            self.stop.wait();
        } else {
            loop {
                let summary = self.summarize(&legal);
                let slice = self.time.next_slice_ms(&summary);
                if slice == 0 || self.stop.wait_timeout(Duration::from_millis(slice)) {
                    break;
                }
            }
            // 時間切れでも、最初のシミュレーションが終わるまでは待つ
            while self.budget.completed() == 0
                && !self.stop.wait_timeout(Duration::from_millis(FIRST_PLAYOUT_POLL_MS))
            {}
        }
        let stats = self.stop_workers()?;
        self.last_stats = stats;

        let mv = self.choose_move(&legal);
        let (runs, wins) = self.root_runs_and_wins(mv);
        info!(
            "best move {mv}: {wins}/{runs} wins, {} playouts ({} ties) in {} ms",
            stats.playouts,
            stats.ties,
            started.elapsed().as_millis()
        );
        Ok(mv)
    }

    fn root_runs_and_wins(&self, mv: Move) -> (u32, u32) {
        self.table
            .find_if_present(self.board.fingerprint())
            .map(|root| self.table.node(root).runs_and_wins(mv))
            .unwrap_or((0, 0))
    }

    /// 勝ち数最大の合法手。超コウで打てない手は除外して選び直す
    fn choose_move(&self, legal: &[Move]) -> Move {
        let Some(root) = self.table.find_if_present(self.board.fingerprint()) else {
            return Move::PASS;
        };
        let node = self.table.node(root);
        let mv = loop {
            let mv = node.move_with_most_wins(legal);
            if mv.is_pass() || self.board.is_legal(mv) {
                break mv;
            }
            node.exclude(mv);
        };
        let (runs, wins) = node.runs_and_wins(mv);
        if runs >= RESIGN_MIN_RUNS && (wins as f32 / runs as f32) < self.config.resign_threshold {
            return Move::RESIGN;
        }
        mv
    }

    /// 手を受け付け、新しい局面から到達できない部分の木を回収する
    pub fn accept_move(&mut self, mv: Move) -> Result<Legality, SearchError> {
        self.stop_ponder();
        let legality = if mv.is_pass() {
            self.board.pass();
            Legality::Ok
        } else {
            self.board.play(mv)
        };
        if legality.is_ok() {
            self.history.push(mv);
            self.reuse_tree()?;
        }
        self.restart_ponder();
        Ok(legality)
    }

    /// 現局面をルートとして mark し、sweep する
    fn reuse_tree(&mut self) -> Result<(), SearchError> {
        let fingerprint = self.board.fingerprint();
        let table = Arc::get_mut(&mut self.table).ok_or(SearchError::TableShared)?;
        if let Some(root) = table.find_or_allocate(fingerprint) {
            table.mark_nodes_reachable_from(root);
        }
        let freed = table.sweep();
        debug!("sweep: freed {freed} nodes, {} still live", table.live_nodes());
        Ok(())
    }

    /// 1手戻す。戻す手がなければ `false`
    pub fn undo(&mut self) -> bool {
        self.stop_ponder();
        let undone = self.history.pop().is_some();
        if undone {
            self.board = self.initial.clone();
            for &mv in &self.history {
                if mv.is_pass() {
                    self.board.pass();
                } else {
                    let legality = self.board.play(mv);
                    debug_assert!(legality.is_ok(), "replayed move {mv} became {legality:?}");
                }
            }
        }
        self.restart_ponder();
        undone
    }

    /// 残り時間（秒）を設定する
    pub fn set_remaining_time(&mut self, seconds: u64) {
        self.remaining_seconds = Some(seconds);
        self.time.set_remaining_seconds(seconds);
    }

    /// 設定を1項目変更する
    ///
    /// 置換表の大きさが変わったときは表を作り直す（既存の統計は捨てる）。
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        self.stop_ponder();
        let previous = self.config.clone();
        let result = self.config.set_property(name, value);
        if result.is_ok() {
            if previous.table_size != self.config.table_size
                || previous.link_ratio != self.config.link_ratio
            {
                self.table = Arc::new(build_table(&self.config, self.board.point_count()));
                info!(
                    "transposition table rebuilt: {} slots, {} links",
                    self.config.slot_count(),
                    self.config.link_capacity()
                );
            }
            if time_settings_changed(&previous, &self.config) {
                self.rebuild_time_manager();
            }
        }
        self.restart_ponder();
        result
    }

    fn rebuild_time_manager(&mut self) {
        self.time = time::from_config(&self.config);
        if let Some(seconds) = self.remaining_seconds {
            self.time.set_remaining_seconds(seconds);
        }
    }

    /// 新しい対局: 開始局面に戻し、置換表と履歴を空にする
    pub fn reset(&mut self) -> Result<(), SearchError> {
        self.stop_ponder();
        self.pending_error = None;
        self.board = self.initial.clone();
        self.history.clear();
        self.remaining_seconds = None;
        self.rebuild_time_manager();
        let table = Arc::get_mut(&mut self.table).ok_or(SearchError::TableShared)?;
        table.clear();
        Ok(())
    }
}

impl<B, P, S> Drop for SearchController<B, P, S>
where
    B: Board,
    P: PlayoutPolicy<B>,
    S: Scorer<B>,
{
    fn drop(&mut self) {
        self.stop.stop();
        for (id, handle) in self.workers.drain(..).enumerate() {
            if handle.join().is_err() {
                warn!("search worker {id} panicked");
            }
        }
    }
}
