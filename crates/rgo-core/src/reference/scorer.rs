//! 中国ルール（面積計算）の採点

use crate::board::Scorer;
use crate::types::Color;

use super::board::GoBoard;

/// 石の数と、一色だけに囲まれた空点の数で数える
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChineseScorer {
    pub komi: f64,
}

impl Default for ChineseScorer {
    fn default() -> Self {
        Self { komi: 7.5 }
    }
}

impl ChineseScorer {
    pub fn new(komi: f64) -> Self {
        Self { komi }
    }

    /// (黒の面積, 白の面積)
    pub fn area(board: &GoBoard) -> (usize, usize) {
        let points = board.size() * board.size();
        let mut area = [0usize; Color::NUM];
        let mut seen = vec![false; points];
        for p in 0..points {
            if let Some(color) = board.stone_at(p) {
                area[color.index()] += 1;
                continue;
            }
            if seen[p] {
                continue;
            }
            // 空点の領域を塗り、接している色を調べる
            let mut region = vec![p];
            let mut borders = [false; Color::NUM];
            seen[p] = true;
            let mut i = 0;
            while i < region.len() {
                let q = region[i];
                i += 1;
                for &n in board.neighbors(q) {
                    let n = n as usize;
                    match board.stone_at(n) {
                        Some(color) => borders[color.index()] = true,
                        None if !seen[n] => {
                            seen[n] = true;
                            region.push(n);
                        }
                        None => {}
                    }
                }
            }
            match borders {
                [true, false] => area[Color::Black.index()] += region.len(),
                [false, true] => area[Color::White.index()] += region.len(),
                _ => {}
            }
        }
        (area[Color::Black.index()], area[Color::White.index()])
    }
}

impl Scorer<GoBoard> for ChineseScorer {
    fn score(&self, board: &GoBoard) -> f64 {
        let (black, white) = Self::area(board);
        black as f64 - white as f64 - self.komi
    }
}
