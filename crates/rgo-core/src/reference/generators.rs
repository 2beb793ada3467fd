//! 参照用の手の生成器

use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::board::Board;
use crate::policy::MoveGenerator;
use crate::types::Move;

use super::board::GoBoard;

/// 自分の眼を埋めない、打てる点から一様に選ぶ
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl MoveGenerator<GoBoard> for RandomGenerator {
    fn name(&self) -> &str {
        "random"
    }

    fn suggest(&mut self, rng: &mut Xoshiro256PlusPlus, board: &GoBoard) -> Option<Move> {
        let points = board.point_count();
        let color = board.color_to_play();
        let start = rng.random_range(0..points);
        (0..points)
            .map(|i| (start + i) % points)
            .find(|&p| board.is_playable(p) && !board.is_eyelike(p, color))
            .map(|p| Move::point(p as u16))
    }

    fn boxed_clone(&self) -> Box<dyn MoveGenerator<GoBoard>> {
        Box::new(*self)
    }
}

/// 直前の手の連がアタリなら取る
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureGenerator;

impl MoveGenerator<GoBoard> for CaptureGenerator {
    fn name(&self) -> &str {
        "capture"
    }

    fn suggest(&mut self, _rng: &mut Xoshiro256PlusPlus, board: &GoBoard) -> Option<Move> {
        let last = board.last_move().to_point()?;
        if board.stone_at(last) != Some(board.color_to_play().opponent()) {
            return None;
        }
        let (_, liberties) = board.group(last);
        match liberties.as_slice() {
            [p] if board.is_playable(*p) => Some(Move::point(*p as u16)),
            _ => None,
        }
    }

    fn boxed_clone(&self) -> Box<dyn MoveGenerator<GoBoard>> {
        Box::new(*self)
    }
}
