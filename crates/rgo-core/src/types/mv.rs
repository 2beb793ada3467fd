//! 指し手（Move）
//!
//! 盤上の点は `0..point_count` の通し番号で表し、パス・投了・無効手は
//! 上位の番兵値で表す。点の番号付けは盤面実装が決める。

use std::fmt;

/// 指し手（16bit）
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Move(u16);

impl Move {
    /// パス
    pub const PASS: Move = Move(u16::MAX - 2);
    /// 投了
    pub const RESIGN: Move = Move(u16::MAX - 1);
    /// 無効値
    pub const NONE: Move = Move(u16::MAX);

    /// 盤上の点として扱える最大数
    pub const MAX_POINTS: usize = (u16::MAX - 2) as usize;

    /// 盤上の点 `index` への着手
    #[inline]
    pub const fn point(index: u16) -> Move {
        debug_assert!((index as usize) < Self::MAX_POINTS);
        Move(index)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_point(self) -> bool {
        (self.0 as usize) < Self::MAX_POINTS
    }

    #[inline]
    pub const fn is_pass(self) -> bool {
        self.0 == Self::PASS.0
    }

    /// 盤上の点ならその番号
    #[inline]
    pub const fn to_point(self) -> Option<usize> {
        if self.is_point() { Some(self.0 as usize) } else { None }
    }

    /// 統計配列上の添字（点は番号そのまま、パスは `point_count`）
    ///
    /// 投了と無効値は統計を持たない。
    #[inline]
    pub fn stat_index(self, point_count: usize) -> Option<usize> {
        if self.is_pass() {
            Some(point_count)
        } else {
            self.to_point().filter(|&p| p < point_count)
        }
    }

    /// `stat_index` の逆変換
    #[inline]
    pub fn from_stat_index(index: usize, point_count: usize) -> Move {
        if index == point_count { Move::PASS } else { Move::point(index as u16) }
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Move::PASS => f.write_str("pass"),
            Move::RESIGN => f.write_str("resign"),
            Move::NONE => f.write_str("none"),
            Move(p) => write!(f, "#{p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_not_points() {
        for mv in [Move::PASS, Move::RESIGN, Move::NONE] {
            assert!(!mv.is_point());
            assert_eq!(mv.to_point(), None);
        }
        assert!(Move::point(0).is_point());
    }

    #[test]
    fn test_stat_index_layout() {
        let points = 25;
        assert_eq!(Move::point(7).stat_index(points), Some(7));
        assert_eq!(Move::PASS.stat_index(points), Some(points));
        assert_eq!(Move::RESIGN.stat_index(points), None);
        assert_eq!(Move::point(25).stat_index(points), None);
        assert_eq!(Move::from_stat_index(points, points), Move::PASS);
        assert_eq!(Move::from_stat_index(3, points), Move::point(3));
    }
}
