//! SearchNode: 1局面ぶんの探索統計
//!
//! - 手ごとのモンテカルロ統計（runs/wins）
//! - 手ごとのRAVE統計（rave_runs/rave_wins）
//! - 子ノードへのリンク列（ChildLinkの侵入型リスト）
//!
//! カウンタはすべてアトミックで、複数ワーカーから同時に加算される。
//! 加算は runs → wins の順、読み出しは wins → runs の順で行うため、
//! 観測者は常に `wins <= runs` を見る。
//!
//! 勝ち数は内部では半勝ち単位で持つ（勝ち 2、持碁 1、負け 0）。

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::pool::{NIL, Poolable};
use crate::types::Move;

/// パスに与える事前統計（10回中1勝）
pub const PASS_PRIOR_RUNS: u32 = 10;
pub const PASS_PRIOR_WINS: u32 = 1;

/// 試行のない手の勝率
pub const NEUTRAL_WIN_RATE: f32 = 0.5;

/// 1回の試行の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    Loss,
    /// 持碁。半勝ちとして数える
    Tie,
    Win,
}

impl Credit {
    #[inline]
    fn half_wins(self) -> u32 {
        match self {
            Credit::Loss => 0,
            Credit::Tie => 1,
            Credit::Win => 2,
        }
    }
}

impl From<bool> for Credit {
    #[inline]
    fn from(win: bool) -> Self {
        if win { Credit::Win } else { Credit::Loss }
    }
}

/// アトミックなビット集合
struct AtomicBits {
    words: Box<[AtomicU64]>,
}

impl AtomicBits {
    fn new(len: usize) -> Self {
        Self {
            words: (0..len.div_ceil(64)).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// ビットを立て、既に立っていたかを返す
    #[inline]
    fn set(&self, index: usize) -> bool {
        let mask = 1u64 << (index % 64);
        self.words[index / 64].fetch_or(mask, Ordering::AcqRel) & mask != 0
    }

    #[inline]
    fn unset(&self, index: usize) {
        let mask = 1u64 << (index % 64);
        self.words[index / 64].fetch_and(!mask, Ordering::AcqRel);
    }

    #[inline]
    fn get(&self, index: usize) -> bool {
        let mask = 1u64 << (index % 64);
        self.words[index / 64].load(Ordering::Acquire) & mask != 0
    }

    fn clear(&self) {
        for word in self.words.iter() {
            word.store(0, Ordering::Relaxed);
        }
    }
}

fn zeroed(len: usize) -> Box<[AtomicU32]> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

/// 探索ノード
///
/// 統計配列の添字は `Move::stat_index`（盤上の点、最後がパス）。
pub struct SearchNode {
    fingerprint: AtomicU64,
    total_runs: AtomicU32,
    runs: Box<[AtomicU32]>,
    /// 半勝ち単位
    wins: Box<[AtomicU32]>,
    rave_runs: Box<[AtomicU32]>,
    /// 半勝ち単位
    rave_wins: Box<[AtomicU32]>,
    has_child: AtomicBits,
    excluded: AtomicBits,
    /// 子リンク列の先頭（リンクプール上の添字）
    children: AtomicU32,
    marked: AtomicBool,
    pool_next: AtomicU32,
}

impl Poolable for SearchNode {
    #[inline]
    fn pool_next(&self) -> &AtomicU32 {
        &self.pool_next
    }
}

impl SearchNode {
    /// 盤上の点が `point_count` 個の盤面用ノードを作る
    pub fn new(point_count: usize) -> Self {
        let len = point_count + 1;
        let node = Self {
            fingerprint: AtomicU64::new(0),
            total_runs: AtomicU32::new(0),
            runs: zeroed(len),
            wins: zeroed(len),
            rave_runs: zeroed(len),
            rave_wins: zeroed(len),
            has_child: AtomicBits::new(len),
            excluded: AtomicBits::new(len),
            children: AtomicU32::new(NIL),
            marked: AtomicBool::new(false),
            pool_next: AtomicU32::new(NIL),
        };
        node.reset(0);
        node
    }

    /// 全統計を初期化し、`fingerprint` の局面用にする
    ///
    /// 子リンク列は呼び出し側（テーブル）が事前にプールへ返している前提。
    pub fn reset(&self, fingerprint: u64) {
        self.fingerprint.store(fingerprint, Ordering::Relaxed);
        self.total_runs.store(0, Ordering::Relaxed);
        for counters in [&self.runs, &self.wins, &self.rave_runs, &self.rave_wins] {
            for c in counters.iter() {
                c.store(0, Ordering::Relaxed);
            }
        }
        let pass = self.pass_index();
        self.runs[pass].store(PASS_PRIOR_RUNS, Ordering::Relaxed);
        self.wins[pass].store(2 * PASS_PRIOR_WINS, Ordering::Relaxed);
        self.has_child.clear();
        self.excluded.clear();
        self.children.store(NIL, Ordering::Relaxed);
        self.marked.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint.load(Ordering::Acquire)
    }

    /// 盤上の点の数
    #[inline]
    pub fn point_count(&self) -> usize {
        self.runs.len() - 1
    }

    #[inline]
    fn pass_index(&self) -> usize {
        self.point_count()
    }

    #[inline]
    fn index(&self, mv: Move) -> Option<usize> {
        mv.stat_index(self.point_count())
    }

    /// このノードを通過した実際の試行数
    #[inline]
    pub fn total_runs(&self) -> u32 {
        self.total_runs.load(Ordering::Acquire)
    }

    /// 手 `mv` を選んだ試行を1回記録する（`bool` は勝ち/負け）
    pub fn record_run(&self, mv: Move, credit: impl Into<Credit>) {
        let Some(i) = self.index(mv) else { return };
        let half = credit.into().half_wins();
        self.total_runs.fetch_add(1, Ordering::Relaxed);
        self.runs[i].fetch_add(1, Ordering::Release);
        if half > 0 {
            self.wins[i].fetch_add(half, Ordering::Release);
        }
    }

    /// 手 `mv` のRAVE統計を1回記録する
    pub fn record_rave(&self, mv: Move, credit: impl Into<Credit>) {
        let Some(i) = self.index(mv) else { return };
        let half = credit.into().half_wins();
        self.rave_runs[i].fetch_add(1, Ordering::Release);
        if half > 0 {
            self.rave_wins[i].fetch_add(half, Ordering::Release);
        }
    }

    /// `(runs, 半勝ち数)`
    #[inline]
    fn runs_and_half_wins(&self, mv: Move) -> (u32, u32) {
        match self.index(mv) {
            Some(i) => {
                let half = self.wins[i].load(Ordering::Acquire);
                let runs = self.runs[i].load(Ordering::Acquire);
                (runs, half)
            }
            None => (0, 0),
        }
    }

    #[inline]
    fn rave_runs_and_half_wins(&self, mv: Move) -> (u32, u32) {
        match self.index(mv) {
            Some(i) => {
                let half = self.rave_wins[i].load(Ordering::Acquire);
                let runs = self.rave_runs[i].load(Ordering::Acquire);
                (runs, half)
            }
            None => (0, 0),
        }
    }

    /// `(runs, wins)`。持碁の半勝ちは切り捨てる。統計を持たない手は `(0, 0)`
    #[inline]
    pub fn runs_and_wins(&self, mv: Move) -> (u32, u32) {
        let (runs, half) = self.runs_and_half_wins(mv);
        (runs, half / 2)
    }

    /// `(rave_runs, rave_wins)`
    #[inline]
    pub fn rave_runs_and_wins(&self, mv: Move) -> (u32, u32) {
        let (runs, half) = self.rave_runs_and_half_wins(mv);
        (runs, half / 2)
    }

    #[inline]
    pub fn runs(&self, mv: Move) -> u32 {
        self.runs_and_wins(mv).0
    }

    #[inline]
    pub fn wins(&self, mv: Move) -> u32 {
        self.runs_and_wins(mv).1
    }

    /// 勝率。試行がなければ中立値
    pub fn win_rate(&self, mv: Move) -> f32 {
        half_rate(self.runs_and_half_wins(mv))
    }

    /// RAVE勝率。試行がなければ中立値
    pub fn rave_win_rate(&self, mv: Move) -> f32 {
        half_rate(self.rave_runs_and_half_wins(mv))
    }

    /// 探索中に非合法と分かった手を除外する
    pub fn exclude(&self, mv: Move) {
        if let Some(i) = self.index(mv) {
            self.excluded.set(i);
        }
    }

    #[inline]
    pub fn is_excluded(&self, mv: Move) -> bool {
        self.index(mv).is_none_or(|i| self.excluded.get(i))
    }

    /// `mv` の子リンクを張る権利を取る。既に取られていれば `false`
    #[inline]
    pub(crate) fn claim_child(&self, mv: Move) -> bool {
        self.index(mv).is_some_and(|i| !self.has_child.set(i))
    }

    #[inline]
    pub(crate) fn release_child(&self, mv: Move) {
        if let Some(i) = self.index(mv) {
            self.has_child.unset(i);
        }
    }

    #[inline]
    pub fn has_child(&self, mv: Move) -> bool {
        self.index(mv).is_some_and(|i| self.has_child.get(i))
    }

    #[inline]
    pub(crate) fn children_head(&self) -> &AtomicU32 {
        &self.children
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    /// 印を付け、既に付いていたかを返す
    #[inline]
    pub(crate) fn mark(&self) -> bool {
        self.marked.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn unmark(&self) {
        self.marked.store(false, Ordering::Release);
    }

    /// 勝ち数最大の手（パスを基準に、`legal` の順で厳密に上回るものだけ採用）
    pub fn move_with_most_wins(&self, legal: &[Move]) -> Move {
        let mut best = Move::PASS;
        let mut best_wins = self.runs_and_half_wins(Move::PASS).1;
        for &mv in legal {
            if self.is_excluded(mv) {
                continue;
            }
            let wins = self.runs_and_half_wins(mv).1;
            if wins > best_wins {
                best = mv;
                best_wins = wins;
            }
        }
        best
    }

    /// 最善手とそれ以外の集計（時間管理用）
    pub fn summarize(&self, legal: &[Move]) -> RootSummary {
        let best = self.move_with_most_wins(legal);
        let (best_runs, best_wins) = self.runs_and_wins(best);
        let mut rest_runs = 0u64;
        let mut rest_half = 0u64;
        for &mv in legal {
            if mv == best || self.is_excluded(mv) {
                continue;
            }
            let (runs, half) = self.runs_and_half_wins(mv);
            rest_runs += u64::from(runs);
            rest_half += u64::from(half);
        }
        let rest_wins = rest_half / 2;
        RootSummary {
            best,
            best_runs: u64::from(best_runs),
            best_wins: u64::from(best_wins),
            rest_runs,
            rest_wins,
            legal_moves: legal.len(),
        }
    }

    /// 試行数の多い順に上位 `limit` 手
    pub fn report(&self, limit: usize) -> Vec<MoveReport> {
        let point_count = self.point_count();
        let mut rows: Vec<MoveReport> = (0..=point_count)
            .map(|i| Move::from_stat_index(i, point_count))
            .filter(|&mv| !self.is_excluded(mv))
            .filter_map(|mv| {
                let (runs, wins) = self.runs_and_wins(mv);
                let (rave_runs, rave_wins) = self.rave_runs_and_wins(mv);
                (runs > 0 || rave_runs > 0).then_some(MoveReport {
                    mv,
                    runs,
                    wins,
                    rave_runs,
                    rave_wins,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.runs.cmp(&a.runs).then(b.wins.cmp(&a.wins)));
        rows.truncate(limit);
        rows
    }
}

#[inline]
fn rate((runs, wins): (u32, u32)) -> f32 {
    if runs == 0 { NEUTRAL_WIN_RATE } else { wins as f32 / runs as f32 }
}

#[inline]
fn half_rate((runs, half): (u32, u32)) -> f32 {
    if runs == 0 { NEUTRAL_WIN_RATE } else { half as f32 / (2 * runs) as f32 }
}

/// 子ノードへのリンク（リンクプールの要素）
///
/// `next` はプールのフリーリストと子リンク列の両方に使う。
pub struct ChildLink {
    child: AtomicU32,
    next: AtomicU32,
}

impl ChildLink {
    pub fn new() -> Self {
        Self {
            child: AtomicU32::new(NIL),
            next: AtomicU32::new(NIL),
        }
    }

    #[inline]
    pub fn child(&self) -> u32 {
        self.child.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_child(&self, child: u32) {
        self.child.store(child, Ordering::Release);
    }

    #[inline]
    pub fn next(&self) -> u32 {
        self.next.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_next(&self, next: u32) {
        self.next.store(next, Ordering::Release);
    }
}

impl Default for ChildLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Poolable for ChildLink {
    #[inline]
    fn pool_next(&self) -> &AtomicU32 {
        &self.next
    }
}

/// ルートの集計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSummary {
    pub best: Move,
    pub best_runs: u64,
    pub best_wins: u64,
    pub rest_runs: u64,
    pub rest_wins: u64,
    pub legal_moves: usize,
}

impl RootSummary {
    /// 統計のない局面（時間管理の初期値に使う）
    pub fn empty(legal_moves: usize) -> Self {
        Self {
            best: Move::PASS,
            best_runs: 0,
            best_wins: 0,
            rest_runs: 0,
            rest_wins: 0,
            legal_moves,
        }
    }
}

/// `SearchNode::report` の1行
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MoveReport {
    pub mv: Move,
    pub runs: u32,
    pub wins: u32,
    pub rave_runs: u32,
    pub rave_wins: u32,
}

impl MoveReport {
    pub fn win_rate(&self) -> f32 {
        rate((self.runs, self.wins))
    }

    pub fn rave_win_rate(&self) -> f32 {
        rate((self.rave_runs, self.rave_wins))
    }
}

impl fmt::Display for MoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>7} runs={:<7} wr={:.3} rave_runs={:<7} rave_wr={:.3}",
            self.mv.to_string(),
            self.runs,
            self.win_rate(),
            self.rave_runs,
            self.rave_win_rate()
        )
    }
}
