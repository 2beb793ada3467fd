//! 探索・設定のエラー型

use thiserror::Error;

use crate::board::IllegalMove;
use crate::types::{Legality, Move};

/// `best_move` などの呼び出し元へ伝える失敗
///
/// プールの枯渇や統計上の端のケースはここに含まれない（その場で処理される）。
#[derive(Debug, Error)]
pub enum SearchError {
    /// プレイアウト方策が非合法手を指した（方策側の契約違反）
    #[error("playout policy `{generator}` played illegal move {mv} ({legality:?})")]
    IllegalPlayoutMove {
        generator: String,
        mv: Move,
        legality: Legality,
    },

    #[error("search worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("failed to spawn search worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// sweep や表の再構築に必要な排他アクセスが取れなかった
    #[error("transposition table is still shared with a running worker")]
    TableShared,
}

impl From<IllegalMove> for SearchError {
    fn from(e: IllegalMove) -> Self {
        SearchError::IllegalPlayoutMove {
            generator: e.generator,
            mv: e.mv,
            legality: e.legality,
        }
    }
}

/// 設定項目のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown property `{0}`")]
    UnknownProperty(String),

    #[error("invalid value `{value}` for `{name}`: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
