//! 参照用の碁盤
//!
//! 取り、自殺手、単純コウ、局面の超コウ（positional superko）、Zobristハッシュ。
//! 点の番号は左上から行優先（`row * size + col`）。

use std::fmt;
use std::sync::Arc;

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use smallvec::SmallVec;

use crate::board::Board;
use crate::types::{Color, Legality, Move};

/// 列の文字（I は使わない）
const COLUMNS: &[u8] = b"ABCDEFGHJKLMNOPQRST";

/// 盤の大きさの範囲
pub const MIN_SIZE: usize = 2;
pub const MAX_SIZE: usize = 19;

type Adjacent = SmallVec<[u16; 4]>;

/// 盤の大きさだけで決まるデータ（同じ大きさの盤で共有）
struct Geometry {
    size: usize,
    neighbors: Vec<Adjacent>,
    diagonals: Vec<Adjacent>,
    stone_keys: Vec<[u64; Color::NUM]>,
    ko_keys: Vec<u64>,
    white_to_play: u64,
}

impl Geometry {
    fn new(size: usize) -> Self {
        let points = size * size;
        let at = |r: isize, c: isize| -> Option<u16> {
            (r >= 0 && c >= 0 && (r as usize) < size && (c as usize) < size)
                .then(|| (r as usize * size + c as usize) as u16)
        };
        let mut neighbors = Vec::with_capacity(points);
        let mut diagonals = Vec::with_capacity(points);
        for p in 0..points {
            let (r, c) = ((p / size) as isize, (p % size) as isize);
            let around = |offsets: [(isize, isize); 4]| -> Adjacent {
                offsets.iter().filter_map(|&(dr, dc)| at(r + dr, c + dc)).collect()
            };
            neighbors.push(around([(-1, 0), (0, -1), (0, 1), (1, 0)]));
            diagonals.push(around([(-1, -1), (-1, 1), (1, -1), (1, 1)]));
        }
        // 大きさごとに固定の種: 同じ大きさの盤は同じハッシュを持つ
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5EED_0000 ^ size as u64);
        let stone_keys = (0..points).map(|_| [rng.next_u64(), rng.next_u64()]).collect();
        let ko_keys = (0..points).map(|_| rng.next_u64()).collect();
        Self {
            size,
            neighbors,
            diagonals,
            stone_keys,
            ko_keys,
            white_to_play: rng.next_u64(),
        }
    }
}

/// 参照用の碁盤
#[derive(Clone)]
pub struct GoBoard {
    geometry: Arc<Geometry>,
    stones: Vec<Option<Color>>,
    to_play: Color,
    ko: Option<usize>,
    turn: usize,
    passes: usize,
    last_move: Move,
    stone_hash: u64,
    /// これまでに現れた石の配置のハッシュ（超コウ判定用）
    history: Vec<u64>,
}

impl GoBoard {
    /// `size` 路の空の盤（黒番）
    pub fn new(size: usize) -> Self {
        assert!((MIN_SIZE..=MAX_SIZE).contains(&size), "board size {size} out of range");
        let geometry = Arc::new(Geometry::new(size));
        Self {
            stones: vec![None; size * size],
            geometry,
            to_play: Color::Black,
            ko: None,
            turn: 0,
            passes: 0,
            last_move: Move::NONE,
            stone_hash: 0,
            history: vec![0],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.geometry.size
    }

    #[inline]
    pub fn stone_at(&self, p: usize) -> Option<Color> {
        self.stones[p]
    }

    #[inline]
    pub fn neighbors(&self, p: usize) -> &[u16] {
        &self.geometry.neighbors[p]
    }

    pub fn last_move(&self) -> Move {
        self.last_move
    }

    /// コウで取り返せない点
    pub fn ko_point(&self) -> Option<usize> {
        self.ko
    }

    /// 点の名前（例: 5路の左上は `A5`）
    pub fn point_name(&self, mv: Move) -> String {
        match mv.to_point() {
            Some(p) if p < self.stones.len() => {
                let size = self.size();
                let (row, col) = (p / size, p % size);
                format!("{}{}", COLUMNS[col] as char, size - row)
            }
            _ => mv.to_string(),
        }
    }

    /// `A5` / `pass` / `resign` を手に変換する
    pub fn parse_move(&self, text: &str) -> Option<Move> {
        let text = text.trim().to_ascii_uppercase();
        match text.as_str() {
            "PASS" => return Some(Move::PASS),
            "RESIGN" => return Some(Move::RESIGN),
            _ => {}
        }
        let mut chars = text.chars();
        let column = chars.next()?;
        let col = COLUMNS.iter().position(|&c| c as char == column)?;
        let number: usize = chars.as_str().parse().ok()?;
        let size = self.size();
        if col >= size || number == 0 || number > size {
            return None;
        }
        Some(Move::point(((size - number) * size + col) as u16))
    }

    /// `p` を含む連の石と呼吸点（重複なし）
    pub fn group(&self, p: usize) -> (Vec<usize>, Vec<usize>) {
        let Some(color) = self.stones[p] else {
            return (Vec::new(), Vec::new());
        };
        let mut seen = vec![false; self.stones.len()];
        let mut stones = vec![p];
        let mut liberties = Vec::new();
        seen[p] = true;
        let mut i = 0;
        while i < stones.len() {
            let s = stones[i];
            i += 1;
            for &n in self.neighbors(s) {
                let n = n as usize;
                if std::mem::replace(&mut seen[n], true) {
                    continue;
                }
                match self.stones[n] {
                    None => liberties.push(n),
                    Some(c) if c == color => stones.push(n),
                    Some(_) => {}
                }
            }
        }
        (stones, liberties)
    }

    /// `color` が `p` に打つと自殺手になるか（取りがあれば自殺ではない）
    pub fn is_suicide(&self, p: usize, color: Color) -> bool {
        for &n in self.neighbors(p) {
            let n = n as usize;
            match self.stones[n] {
                None => return false,
                Some(c) => {
                    let libs = self.group(n).1.len();
                    if c == color && libs > 1 {
                        return false;
                    }
                    if c != color && libs == 1 {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// `color` にとって眼のような点（四方が自石で、斜めに相手が多すぎない）
    pub fn is_eyelike(&self, p: usize, color: Color) -> bool {
        if self.stones[p].is_some() {
            return false;
        }
        if !self.neighbors(p).iter().all(|&n| self.stones[n as usize] == Some(color)) {
            return false;
        }
        let opponents = self.geometry.diagonals[p]
            .iter()
            .filter(|&&d| self.stones[d as usize] == Some(color.opponent()))
            .count();
        let on_edge = self.neighbors(p).len() < 4;
        if on_edge { opponents == 0 } else { opponents < 2 }
    }

    /// 手番側が `p` に `play_fast` で打てるか
    pub fn is_playable(&self, p: usize) -> bool {
        self.stones[p].is_none() && self.ko != Some(p) && !self.is_suicide(p, self.to_play)
    }

    #[inline]
    fn stone_key(&self, p: usize, color: Color) -> u64 {
        self.geometry.stone_keys[p][color.index()]
    }

    fn place(&mut self, mv: Move, check_superko: bool) -> Legality {
        let Some(p) = mv.to_point().filter(|&p| p < self.stones.len()) else {
            return Legality::OffBoard;
        };
        if self.stones[p].is_some() {
            return Legality::Occupied;
        }
        if self.ko == Some(p) {
            return Legality::Ko;
        }
        let color = self.to_play;
        let opponent = color.opponent();
        self.stones[p] = Some(color);
        let mut hash = self.stone_hash ^ self.stone_key(p, color);

        let mut captured: SmallVec<[usize; 8]> = SmallVec::new();
        for i in 0..self.neighbors(p).len() {
            let n = self.geometry.neighbors[p][i] as usize;
            if self.stones[n] != Some(opponent) {
                continue;
            }
            let (group, liberties) = self.group(n);
            if liberties.is_empty() {
                for s in group {
                    self.stones[s] = None;
                    hash ^= self.stone_key(s, opponent);
                    captured.push(s);
                }
            }
        }

        let (own, own_liberties) = self.group(p);
        if own_liberties.is_empty() {
            self.stones[p] = None;
            return Legality::Suicide;
        }
        if check_superko && self.history.contains(&hash) {
            self.stones[p] = None;
            for &s in &captured {
                self.stones[s] = Some(opponent);
            }
            return Legality::Superko;
        }

        let is_ko = captured.len() == 1 && own.len() == 1 && own_liberties.len() == 1;
        self.ko = is_ko.then(|| captured[0]);
        self.stone_hash = hash;
        self.history.push(hash);
        self.turn += 1;
        self.passes = 0;
        self.to_play = opponent;
        self.last_move = mv;
        Legality::Ok
    }
}

impl Board for GoBoard {
    fn point_count(&self) -> usize {
        self.stones.len()
    }

    fn play(&mut self, mv: Move) -> Legality {
        if mv.is_pass() {
            self.pass();
            return Legality::Ok;
        }
        self.place(mv, true)
    }

    fn play_fast(&mut self, mv: Move) -> Legality {
        if mv.is_pass() {
            self.pass();
            return Legality::Ok;
        }
        self.place(mv, false)
    }

    fn pass(&mut self) {
        self.ko = None;
        self.passes += 1;
        self.turn += 1;
        self.to_play = self.to_play.opponent();
        self.last_move = Move::PASS;
    }

    fn copy_data_from(&mut self, other: &Self) {
        if !Arc::ptr_eq(&self.geometry, &other.geometry) {
            self.geometry = other.geometry.clone();
        }
        self.stones.clone_from(&other.stones);
        self.history.clone_from(&other.history);
        self.to_play = other.to_play;
        self.ko = other.ko;
        self.turn = other.turn;
        self.passes = other.passes;
        self.last_move = other.last_move;
        self.stone_hash = other.stone_hash;
    }

    fn fingerprint(&self) -> u64 {
        let mut hash = self.stone_hash;
        if self.to_play == Color::White {
            hash ^= self.geometry.white_to_play;
        }
        if let Some(ko) = self.ko {
            hash ^= self.geometry.ko_keys[ko];
        }
        hash
    }

    fn legal_moves(&self, out: &mut Vec<Move>) {
        let playable = (0..self.stones.len()).filter(|&p| self.is_playable(p));
        out.extend(playable.map(|p| Move::point(p as u16)));
    }

    fn color_to_play(&self) -> Color {
        self.to_play
    }

    fn turn(&self) -> usize {
        self.turn
    }

    fn passes(&self) -> usize {
        self.passes
    }
}

impl fmt::Display for GoBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        for row in 0..size {
            write!(f, "{:>2} ", size - row)?;
            for col in 0..size {
                let p = row * size + col;
                let c = match self.stones[p] {
                    Some(Color::Black) => '#',
                    Some(Color::White) => 'O',
                    None if self.ko == Some(p) => '*',
                    None => '.',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        write!(f, "   ")?;
        for &c in COLUMNS.iter().take(size) {
            write!(f, "{}", c as char)?;
        }
        writeln!(f)
    }
}

impl fmt::Debug for GoBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GoBoard(turn {}, {} to play)", self.turn, self.to_play)?;
        fmt::Display::fmt(self, f)
    }
}
