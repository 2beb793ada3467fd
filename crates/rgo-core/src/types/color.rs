//! 石の色。黒が先手。
//!
//! 盤上の石と手番の両方をこの型で表す。

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    White = 1,
}

impl Color {
    /// 色ごとの配列（AMAF の手番別表、取り石数など）の長さ
    pub const NUM: usize = 2;

    /// 反対の色
    #[inline]
    pub const fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// 色別配列の添字。黒 0、白 1
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 表示や JSON 出力に使う小文字の色名
    pub const fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        self.opponent()
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
