//! 参照盤面上でエンジン同士を1局対局させる

use std::time::Instant;

use anyhow::{Context, Result, bail};
use rgo_core::policy::PolicyChain;
use rgo_core::reference::{self, ChineseScorer, GoBoard};
use rgo_core::tt::MoveReport;
use rgo_core::{Board, Color, Move, Scorer, SearchConfig, SearchController};
use serde::Serialize;

pub type GoController = SearchController<GoBoard, PolicyChain<GoBoard>, ChineseScorer>;

/// 対局設定
#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    pub size: usize,
    pub komi: f64,
    /// これを超えたら打ち切り（地を数えて勝敗を決める）
    pub max_moves: u32,
}

/// 1手ごとに呼ばれるイベント
#[derive(Debug, Clone, Serialize)]
pub struct MoveEvent {
    pub ply: u32,
    pub color: Color,
    #[serde(rename = "move")]
    pub mv: String,
    pub playouts: u64,
    pub ties: u64,
    pub elapsed_ms: u64,
    /// 着手前のルートの上位手
    pub top: Vec<MoveReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    TwoPasses,
    Resignation,
    MaxMoves,
}

/// 対局結果
#[derive(Debug, Clone, Serialize)]
pub struct GameResult {
    pub winner: Option<Color>,
    pub reason: EndReason,
    pub plies: u32,
    /// 黒から見た面積差（コミ込み）
    pub score: f64,
    pub moves: Vec<String>,
}

/// 参照盤面・既定方策・中国ルール採点でコントローラを作る
pub fn new_controller(game: &GameConfig, config: SearchConfig) -> Result<GoController> {
    if !(reference::MIN_SIZE..=reference::MAX_SIZE).contains(&game.size) {
        bail!(
            "board size {} out of range {}..={}",
            game.size,
            reference::MIN_SIZE,
            reference::MAX_SIZE
        );
    }
    let policy = reference::default_policy().context("failed to build playout policy")?;
    SearchController::new(GoBoard::new(game.size), policy, ChineseScorer::new(game.komi), config)
        .context("invalid search configuration")
}

/// 1局を実行する
///
/// 両者とも `controller` が打つ。2連続パス・投了・手数上限のいずれかで終わる。
pub fn run_game(
    controller: &mut GoController,
    game: &GameConfig,
    on_move: &mut dyn FnMut(&MoveEvent),
) -> Result<GameResult> {
    let scorer = ChineseScorer::new(game.komi);
    let mut moves = Vec::new();
    let mut reason = EndReason::MaxMoves;
    let mut resigned = None;

    for ply in 1..=game.max_moves {
        if controller.board().is_game_over() {
            reason = EndReason::TwoPasses;
            break;
        }
        let color = controller.board().color_to_play();
        let started = Instant::now();
        let mv = controller.best_move().with_context(|| format!("search failed at ply {ply}"))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let stats = controller.last_stats();
        let name = controller.board().point_name(mv);
        let event = MoveEvent {
            ply,
            color,
            mv: name.clone(),
            playouts: stats.playouts,
            ties: stats.ties,
            elapsed_ms,
            top: controller.root_report(3),
        };
        on_move(&event);
        moves.push(name);

        if mv == Move::RESIGN {
            resigned = Some(color);
            reason = EndReason::Resignation;
            break;
        }
        let legality = controller.accept_move(mv)?;
        if !legality.is_ok() {
            bail!("engine chose {mv} at ply {ply}, which the board rejects: {legality:?}");
        }
    }
    if reason == EndReason::MaxMoves && controller.board().is_game_over() {
        reason = EndReason::TwoPasses;
    }

    let score = scorer.score(controller.board());
    let winner = match resigned {
        Some(loser) => Some(!loser),
        None => scorer.winner(controller.board()),
    };
    Ok(GameResult { winner, reason, plies: moves.len() as u32, score, moves })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgo_core::search::TimeManagement;

    fn quick_config() -> SearchConfig {
        SearchConfig {
            threads: 1,
            msec: 0,
            playouts: 64,
            table_size: 10,
            time_management: TimeManagement::Fixed,
            seed: 7,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_game_ends_within_max_moves() {
        let game = GameConfig { size: 3, komi: 0.5, max_moves: 30 };
        let mut controller = new_controller(&game, quick_config()).unwrap();
        let mut events = Vec::new();
        let result = run_game(&mut controller, &game, &mut |e| events.push(e.clone())).unwrap();

        assert!(result.plies <= 30);
        assert_eq!(events.len() as u32, result.plies);
        assert_eq!(result.moves.len(), events.len());
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.ply, i as u32 + 1);
            assert!(event.playouts <= 64);
        }
        if result.reason == EndReason::TwoPasses {
            let expected = if result.score > 0.0 { Color::Black } else { Color::White };
            assert_eq!(result.winner, Some(expected));
        }
    }

    #[test]
    fn test_rejects_board_size_out_of_range() {
        let game = GameConfig { size: 1, komi: 7.5, max_moves: 10 };
        assert!(new_controller(&game, quick_config()).is_err());
    }

    #[test]
    fn test_result_serializes_to_json() {
        let game = GameConfig { size: 2, komi: 0.5, max_moves: 4 };
        let mut controller = new_controller(&game, quick_config()).unwrap();
        let result = run_game(&mut controller, &game, &mut |_| {}).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["plies"], result.plies);
        assert!(json["reason"].is_string());
    }
}
