//! 着手の合法性

/// `Board::play` / `Board::play_fast` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Legality {
    Ok,
    /// 既に石がある
    Occupied,
    /// 自殺手
    Suicide,
    /// 単純なコウ
    Ko,
    /// 同一局面の再現（`play_fast` では検査しない）
    Superko,
    /// 盤外、または盤面が扱えない手（投了など）
    OffBoard,
}

impl Legality {
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Legality::Ok)
    }
}
