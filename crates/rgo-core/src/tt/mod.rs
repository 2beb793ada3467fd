//! 置換表モジュール
//!
//! 局面のハッシュ（fingerprint）から探索ノードを引く置換表。
//! 合流（transposition）によって探索木はDAGになる。
//!
//! - `SearchNode`: 1局面の統計と子リンク列
//! - `ChildLink`: 子リンク列の要素
//! - `TranspositionTable`: スロット配列と2つのプール（ノード、リンク）
//!
//! 手番をまたいで木を再利用するため、着手のたびに新しいルートから
//! 到達可能なノードへ印を付け（mark）、残りをプールへ返す（sweep）。

mod node;
mod table;

#[cfg(test)]
mod tests;

pub use node::{
    ChildLink, Credit, MoveReport, NEUTRAL_WIN_RATE, PASS_PRIOR_RUNS, PASS_PRIOR_WINS,
    RootSummary, SearchNode,
};
pub use table::{Children, NodeId, TranspositionTable};
