//! 参照用の盤面・採点・プレイアウト方策
//!
//! 探索を端から端まで動かすための小さな実装。テストとツールで使う。

mod board;
mod generators;
mod scorer;


pub use board::{GoBoard, MAX_SIZE, MIN_SIZE};
pub use generators::{CaptureGenerator, RandomGenerator};
pub use scorer::ChineseScorer;

use crate::policy::{PolicyBuilder, PolicyChain, PolicyError};

/// 既定のパイプライン
pub const DEFAULT_PIPELINE: &str = "capture,random";

/// `random` と `capture` を登録したビルダー
pub fn policy_builder() -> PolicyBuilder<GoBoard> {
    let mut builder = PolicyBuilder::new();
    builder
        .register("random", || Box::new(RandomGenerator))
        .register("capture", || Box::new(CaptureGenerator));
    builder
}

/// `DEFAULT_PIPELINE` の連鎖
pub fn default_policy() -> Result<PolicyChain<GoBoard>, PolicyError> {
    policy_builder().build(DEFAULT_PIPELINE)
}
