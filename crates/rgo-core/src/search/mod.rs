//! モンテカルロ木探索
//!
//! - `descender`: 木の中での手の選択（RAVE / UCB1-TUNED）
//! - `worker`: プレイアウトワーカー（1スレッド1ワーカー）
//! - `controller`: ワーカーの起動・停止、時間管理、推奨手の決定、木の再利用
//! - `stop`: 停止フラグとプレイアウト上限
//! - `config` / `error`: 設定とエラー

mod config;
mod controller;
mod descender;
mod error;
mod stop;
mod worker;

pub use config::{DescenderKind, SearchConfig, TABLE_SIZE_RANGE, TimeManagement};
pub use controller::{RESIGN_MIN_RUNS, SearchController, SessionStats};
pub use descender::{Descender, RaveDescender, UctDescender, select_move};
pub use error::{ConfigError, SearchError};
pub use stop::{StopHandle, StopSignal};
pub use worker::MAX_GAME_LENGTH_FACTOR;
