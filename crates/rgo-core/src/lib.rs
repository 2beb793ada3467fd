//! # rgo-core
//!
//! 囲碁エンジンの指し手探索コア。
//!
//! ## モジュール構成
//!
//! - `types`: 基本型（Color, Move, Legality）
//! - `board`: 盤面・プレイアウト方策・採点器の外部インターフェース
//! - `pool`: 固定容量フリーリスト
//! - `tt`: 置換表（局面DAGとノード統計）
//! - `search`: UCT/RAVE降下、並列プレイアウト、探索コントローラ
//! - `time`: 持ち時間管理（固定配分 / 信頼度による早期打ち切り）
//! - `policy`: プレイアウト方策パイプライン
//! - `reference`: テスト・ツール用の参照実装（小盤面の碁盤と採点器）
//!

pub mod types;

pub mod board;

pub mod pool;

pub mod tt;

pub mod search;

pub mod time;

pub mod policy;

pub mod reference;

pub use board::{Board, IllegalMove, PlayoutPolicy, Scorer};
pub use search::{ConfigError, SearchConfig, SearchController, SearchError};
pub use types::{Color, Legality, Move};
