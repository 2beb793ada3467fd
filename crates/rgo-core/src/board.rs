//! 盤面・プレイアウト方策・採点の外部インターフェース
//!
//! 探索は盤面のルール（合法性、コウ、採点、Zobristハッシュ）を知らない。
//! ここで定義するトレイトを通してのみ盤面に触れる。

use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use crate::types::{Color, Legality, Move};

/// 盤面
///
/// ワーカーは盤面を共有せず、各自がクローンを持つ。
pub trait Board: Clone + Send + 'static {
    /// 盤上の点の数（`Move::point` の上限）
    fn point_count(&self) -> usize;

    /// 超コウまで検査して着手する。非合法なら盤面は変わらない
    fn play(&mut self, mv: Move) -> Legality;

    /// 超コウ検査を省いて着手する（プレイアウト用）。非合法なら盤面は変わらない
    fn play_fast(&mut self, mv: Move) -> Legality;

    /// パスする
    fn pass(&mut self);

    /// `other` の内容をそのまま写す（確保済みのバッファを再利用する）
    fn copy_data_from(&mut self, other: &Self);

    /// 局面（石の配置と手番）のハッシュ
    fn fingerprint(&self) -> u64;

    /// 現局面で検討に値する着手を盤の順に `out` へ追加する（パスは含めない）
    fn legal_moves(&self, out: &mut Vec<Move>);

    fn color_to_play(&self) -> Color;

    /// これまでに指された手数
    fn turn(&self) -> usize;

    /// 直近の連続パス数
    fn passes(&self) -> usize;

    /// 2連続パスで終局
    fn is_game_over(&self) -> bool {
        self.passes() >= 2
    }

    /// `mv` が超コウを含めて合法か
    fn is_legal(&self, mv: Move) -> bool {
        let mut trial = self.clone();
        trial.play(mv).is_ok()
    }
}

/// プレイアウト方策が不正な手を返した
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{generator} played illegal move {mv} ({legality:?})")]
pub struct IllegalMove {
    pub generator: String,
    pub mv: Move,
    pub legality: Legality,
}

/// プレイアウト方策
///
/// 木を抜けた後、終局まで1手ずつ呼ばれる。返した手は既に `board` に指されている。
pub trait PlayoutPolicy<B: Board>: Send + Clone + 'static {
    fn select_and_play_one_move(
        &mut self,
        rng: &mut Xoshiro256PlusPlus,
        board: &mut B,
    ) -> Result<Move, IllegalMove>;
}

/// 終局図の採点
pub trait Scorer<B: Board>: Send + Clone + 'static {
    /// 黒から見た目数差（コミ込み）
    fn score(&self, board: &B) -> f64;

    /// 勝者。`None` は持碁
    fn winner(&self, board: &B) -> Option<Color> {
        let score = self.score(board);
        if score > 0.0 {
            Some(Color::Black)
        } else if score < 0.0 {
            Some(Color::White)
        } else {
            None
        }
    }
}
