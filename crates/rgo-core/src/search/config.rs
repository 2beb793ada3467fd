//! 探索の設定
//!
//! TOMLなどから `serde` で読み込むほか、`set_property(name, value)` で
//! テキストのまま1項目ずつ変更できる。

use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;

/// 木の中で使う手の選択方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescenderKind {
    Rave,
    Uct,
}

impl FromStr for DescenderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rave" => Ok(DescenderKind::Rave),
            "uct" => Ok(DescenderKind::Uct),
            _ => Err("expected `rave` or `uct`".to_string()),
        }
    }
}

impl fmt::Display for DescenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DescenderKind::Rave => "rave",
            DescenderKind::Uct => "uct",
        })
    }
}

/// 時間管理の方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeManagement {
    /// 1手に一定時間
    Fixed,
    /// スライスごとに確信度を見て早めに打ち切る
    Exiting,
}

impl FromStr for TimeManagement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "uniform" => Ok(TimeManagement::Fixed),
            "exiting" => Ok(TimeManagement::Exiting),
            _ => Err("expected `fixed` or `exiting`".to_string()),
        }
    }
}

impl fmt::Display for TimeManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeManagement::Fixed => "fixed",
            TimeManagement::Exiting => "exiting",
        })
    }
}

/// 置換表の大きさ（log2 スロット数）の範囲
pub const TABLE_SIZE_RANGE: std::ops::RangeInclusive<u32> = 1..=26;

/// 探索設定
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// ワーカースレッド数
    pub threads: usize,
    /// 1手あたりの時間（ms）。0 は時間制限なし（`playouts` が必要）
    pub msec: u64,
    /// 相手の手番中も探索を続ける
    pub ponder: bool,
    /// 1手あたりのシミュレーション回数の上限。0 は無制限
    pub playouts: u64,
    /// 置換表のスロット数（log2）
    pub table_size: u32,
    /// 子リンクの数（スロット数に対する倍率）
    pub link_ratio: usize,
    pub descender: DescenderKind,
    /// RAVE選択に加える探索項の係数
    pub exploration: f32,
    /// UCB1-TUNED の係数
    pub uct_exploration: f32,
    /// RAVE重みの減衰定数
    pub rave_bias: f32,
    pub time_management: TimeManagement,
    /// 1手を分割するスライス数
    pub slices: u32,
    /// 早期終了の確信度しきい値
    pub confidence_threshold: f64,
    /// 残り手数の見積もり係数（合法手数に掛ける）
    pub time_constant: f64,
    /// 残り手数の見積もりの下限
    pub min_moves_left: u64,
    /// 残り時間から差し引く予備（ms）
    pub reserve_ms: u64,
    /// これを下回る勝率なら投了
    pub resign_threshold: f32,
    /// ワーカー乱数の種
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            msec: 1000,
            ponder: false,
            playouts: 0,
            table_size: 14,
            link_ratio: 3,
            descender: DescenderKind::Rave,
            exploration: 0.0,
            uct_exploration: 0.4,
            rave_bias: 0.0009,
            time_management: TimeManagement::Exiting,
            slices: 3,
            confidence_threshold: 0.95,
            time_constant: 0.20,
            min_moves_left: 10,
            reserve_ms: 10_000,
            resign_threshold: 0.1,
            seed: 0,
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::invalid(name, value, e.to_string()))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::invalid(name, value, "expected a boolean")),
    }
}

impl SearchConfig {
    /// 置換表のスロット数
    pub fn slot_count(&self) -> usize {
        1usize << self.table_size
    }

    /// 子リンクの数
    pub fn link_capacity(&self) -> usize {
        self.slot_count() * self.link_ratio
    }

    /// 1項目をテキストで設定する
    ///
    /// 失敗した場合、設定は変更されない。
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        match name {
            "threads" => next.threads = parse(name, value)?,
            "msec" => next.msec = parse(name, value)?,
            "ponder" => next.ponder = parse_bool(name, value)?,
            "playouts" => next.playouts = parse(name, value)?,
            "table-size" => next.table_size = parse(name, value)?,
            "link-ratio" => next.link_ratio = parse(name, value)?,
            "descender" => next.descender = parse(name, value)?,
            "exploration" | "c" => next.exploration = parse(name, value)?,
            "uct-exploration" => next.uct_exploration = parse(name, value)?,
            "rave-bias" => next.rave_bias = parse(name, value)?,
            "time-management" => next.time_management = parse(name, value)?,
            "slices" => next.slices = parse(name, value)?,
            "confidence" => next.confidence_threshold = parse(name, value)?,
            "time-constant" => next.time_constant = parse(name, value)?,
            "min-moves-left" => next.min_moves_left = parse(name, value)?,
            "reserve-ms" => next.reserve_ms = parse(name, value)?,
            "resign" => next.resign_threshold = parse(name, value)?,
            "seed" => next.seed = parse(name, value)?,
            _ => return Err(ConfigError::UnknownProperty(name.to_string())),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// 値の範囲と組み合わせを検査する
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::invalid(
                "threads",
                self.threads,
                "at least one worker is required",
            ));
        }
        if !TABLE_SIZE_RANGE.contains(&self.table_size) {
            return Err(ConfigError::invalid(
                "table-size",
                self.table_size,
                format!("must be within {TABLE_SIZE_RANGE:?}"),
            ));
        }
        if self.link_ratio == 0 {
            return Err(ConfigError::invalid("link-ratio", self.link_ratio, "must be positive"));
        }
        if self.slices == 0 {
            return Err(ConfigError::invalid("slices", self.slices, "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::invalid(
                "confidence",
                self.confidence_threshold,
                "must be within 0.0..=1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.resign_threshold) {
            return Err(ConfigError::invalid(
                "resign",
                self.resign_threshold,
                "must be within 0.0..=1.0",
            ));
        }
        if self.exploration < 0.0 || self.uct_exploration < 0.0 || self.rave_bias < 0.0 {
            return Err(ConfigError::invalid(
                "exploration",
                format!("{}/{}/{}", self.exploration, self.uct_exploration, self.rave_bias),
                "exploration and rave bias must not be negative",
            ));
        }
        if self.msec == 0 && self.playouts == 0 {
            return Err(ConfigError::invalid(
                "msec",
                self.msec,
                "an unlimited time budget needs a playout cap",
            ));
        }
        Ok(())
    }
}
