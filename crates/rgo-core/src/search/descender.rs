//! 木の中での手の選択
//!
//! 各手の探索価値を計算し、最大のものを選ぶ。
//! 同値のときは先に見た手（パス、続いて盤の順）を残すので、結果は常に決定的。

use crate::tt::SearchNode;
use crate::types::Move;

/// 探索価値の計算方法
pub trait Descender: Send + Sync {
    fn name(&self) -> &'static str;

    /// `node` で手 `mv` を選ぶ価値。除外された手は `-inf`
    fn search_value(&self, node: &SearchNode, mv: Move) -> f32;
}

/// パスを基準に `legal` の中から探索価値が最大の手を選ぶ
pub fn select_move(descender: &dyn Descender, node: &SearchNode, legal: &[Move]) -> Move {
    let mut best = Move::PASS;
    let mut best_value = descender.search_value(node, Move::PASS);
    for &mv in legal {
        let value = descender.search_value(node, mv);
        if value > best_value {
            best = mv;
            best_value = value;
        }
    }
    best
}

/// RAVE（AMAF統計）と実統計の混合
///
/// ```text
/// w     = rave_runs / (rave_runs + runs + rave_runs * runs * rave_bias)
/// value = (1 - w) * win_rate + w * rave_win_rate
/// ```
///
/// `exploration > 0` のときは UCT 風の項 `exploration * sqrt(ln(N + 1) / (runs + 1))` を加える。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaveDescender {
    pub rave_bias: f32,
    pub exploration: f32,
}

impl RaveDescender {
    pub fn new(rave_bias: f32, exploration: f32) -> Self {
        Self {
            rave_bias,
            exploration,
        }
    }

    /// RAVE統計の重み。RAVE試行がなければ0
    #[inline]
    pub fn rave_weight(&self, runs: f32, rave_runs: f32) -> f32 {
        if rave_runs == 0.0 {
            return 0.0;
        }
        rave_runs / (rave_runs + runs + rave_runs * runs * self.rave_bias)
    }
}

impl Descender for RaveDescender {
    fn name(&self) -> &'static str {
        "rave"
    }

    fn search_value(&self, node: &SearchNode, mv: Move) -> f32 {
        if node.is_excluded(mv) {
            return f32::NEG_INFINITY;
        }
        let (runs, _) = node.runs_and_wins(mv);
        let mut value = if mv.is_pass() {
            node.win_rate(mv)
        } else {
            let (rave_runs, _) = node.rave_runs_and_wins(mv);
            let w = self.rave_weight(runs as f32, rave_runs as f32);
            (1.0 - w) * node.win_rate(mv) + w * node.rave_win_rate(mv)
        };
        if self.exploration > 0.0 {
            let parent = node.total_runs() as f32 + 1.0;
            value += self.exploration * (parent.ln() / (runs as f32 + 1.0)).sqrt();
        }
        value
    }
}

/// UCB1-TUNED
///
/// 試行のない手は `+inf`（必ず一度は試す）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UctDescender {
    pub exploration: f32,
}

impl UctDescender {
    pub fn new(exploration: f32) -> Self {
        Self { exploration }
    }
}

impl Descender for UctDescender {
    fn name(&self) -> &'static str {
        "uct"
    }

    fn search_value(&self, node: &SearchNode, mv: Move) -> f32 {
        if node.is_excluded(mv) {
            return f32::NEG_INFINITY;
        }
        let runs = node.runs(mv) as f32;
        if runs == 0.0 {
            return f32::INFINITY;
        }
        let mean = node.win_rate(mv);
        let log_parent = (node.total_runs().max(1) as f32).ln();
        // 報酬は 0, 0.5, 1 なので二乗平均は勝率以下。勝率で上から押さえる
        let variance = mean - mean * mean + (2.0 * log_parent / runs).sqrt();
        let uncertainty = self.exploration * (log_parent / runs * variance.min(0.25)).sqrt();
        mean + uncertainty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: usize = 9;

    fn p(i: u16) -> Move {
        Move::point(i)
    }

    #[test]
    fn test_rave_weight_edges() {
        let rave = RaveDescender::new(0.0009, 0.0);
        assert_eq!(rave.rave_weight(0.0, 0.0), 0.0);
        assert_eq!(rave.rave_weight(10.0, 0.0), 0.0);
        assert_eq!(rave.rave_weight(0.0, 10.0), 1.0);
        let w_small = rave.rave_weight(10.0, 100.0);
        let w_large = rave.rave_weight(1000.0, 100.0);
        assert!(w_large < w_small);
    }

    #[test]
    fn test_rave_value_blends_rates() {
        let rave = RaveDescender::new(0.0, 0.0);
        let node = SearchNode::new(POINTS);
        // 実統計 0/1、RAVE 1/1 → 重み 1/2
        node.record_run(p(0), false);
        node.record_rave(p(0), true);
        assert!((rave.search_value(&node, p(0)) - 0.5).abs() < 1e-6);
        // 統計なしは中立値
        assert_eq!(rave.search_value(&node, p(1)), 0.5);
    }

    #[test]
    fn test_pass_uses_prior_only() {
        let rave = RaveDescender::new(0.0009, 0.0);
        let node = SearchNode::new(POINTS);
        assert!((rave.search_value(&node, Move::PASS) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_excluded_moves_are_never_selected() {
        let rave = RaveDescender::new(0.0009, 0.0);
        let node = SearchNode::new(POINTS);
        for _ in 0..10 {
            node.record_run(p(2), true);
        }
        node.exclude(p(2));
        assert_eq!(rave.search_value(&node, p(2)), f32::NEG_INFINITY);
        assert_eq!(select_move(&rave, &node, &[p(1), p(2)]), p(1));
    }

    #[test]
    fn test_ties_keep_first_move() {
        let rave = RaveDescender::new(0.0009, 0.0);
        let node = SearchNode::new(POINTS);
        assert_eq!(select_move(&rave, &node, &[p(3), p(1), p(2)]), p(3));
        assert_eq!(select_move(&rave, &node, &[]), Move::PASS);
    }

    #[test]
    fn test_rave_prefers_strong_amaf_move() {
        let rave = RaveDescender::new(0.0009, 0.0);
        let node = SearchNode::new(POINTS);
        for _ in 0..50 {
            node.record_rave(p(4), true);
            node.record_rave(p(5), false);
        }
        assert_eq!(select_move(&rave, &node, &[p(5), p(4)]), p(4));
    }

    #[test]
    fn test_uct_tries_unvisited_first() {
        let uct = UctDescender::new(0.4);
        let node = SearchNode::new(POINTS);
        for _ in 0..20 {
            node.record_run(p(0), true);
        }
        assert_eq!(uct.search_value(&node, p(1)), f32::INFINITY);
        assert_eq!(select_move(&uct, &node, &[p(0), p(1)]), p(1));
    }

    #[test]
    fn test_uct_balances_rate_and_uncertainty() {
        let uct = UctDescender::new(0.4);
        let node = SearchNode::new(POINTS);
        for i in 0..100 {
            node.record_run(p(0), i % 10 != 0);
        }
        for i in 0..100 {
            node.record_run(p(1), i % 2 == 0);
        }
        let strong = uct.search_value(&node, p(0));
        let weak = uct.search_value(&node, p(1));
        assert!(strong > weak);
        assert!(strong > node.win_rate(p(0)));
    }
}
