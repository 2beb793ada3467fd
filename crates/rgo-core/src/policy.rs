//! プレイアウト方策のパイプライン
//!
//! `"capture,random"` のような名前の列から、前から順に手を提案させる
//! 生成器の連鎖（`PolicyChain`）を組み立てる。最初に手を提案した生成器が勝ち、
//! 誰も提案しなければパスする。

use std::collections::BTreeMap;
use std::fmt;

use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use crate::board::{Board, IllegalMove, PlayoutPolicy};
use crate::types::Move;

/// 手の生成器
pub trait MoveGenerator<B: Board>: Send {
    fn name(&self) -> &str;

    /// 打つべき手があれば返す（盤面は変更しない）
    fn suggest(&mut self, rng: &mut Xoshiro256PlusPlus, board: &B) -> Option<Move>;

    fn boxed_clone(&self) -> Box<dyn MoveGenerator<B>>;
}

/// 生成器の連鎖
pub struct PolicyChain<B: Board> {
    generators: Vec<Box<dyn MoveGenerator<B>>>,
}

impl<B: Board> PolicyChain<B> {
    pub fn new(generators: Vec<Box<dyn MoveGenerator<B>>>) -> Self {
        Self { generators }
    }

    /// 生成器の名前（先頭から）
    pub fn names(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.name()).collect()
    }
}

impl<B: Board> Clone for PolicyChain<B> {
    fn clone(&self) -> Self {
        Self {
            generators: self.generators.iter().map(|g| g.boxed_clone()).collect(),
        }
    }
}

impl<B: Board> fmt::Debug for PolicyChain<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<B: Board> PlayoutPolicy<B> for PolicyChain<B> {
    fn select_and_play_one_move(
        &mut self,
        rng: &mut Xoshiro256PlusPlus,
        board: &mut B,
    ) -> Result<Move, IllegalMove> {
        for generator in &mut self.generators {
            if let Some(mv) = generator.suggest(rng, board) {
                let legality = board.play_fast(mv);
                if !legality.is_ok() {
                    return Err(IllegalMove {
                        generator: generator.name().to_string(),
                        mv,
                        legality,
                    });
                }
                return Ok(mv);
            }
        }
        board.pass();
        Ok(Move::PASS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("unknown move generator `{name}` (known: {known})")]
    UnknownGenerator { name: String, known: String },

    #[error("policy pipeline is empty")]
    EmptyPipeline,
}

type Factory<B> = Box<dyn Fn() -> Box<dyn MoveGenerator<B>> + Send + Sync>;

/// 名前から生成器を作るレジストリ
pub struct PolicyBuilder<B: Board> {
    factories: BTreeMap<String, Factory<B>>,
}

impl<B: Board> Default for PolicyBuilder<B> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<B: Board> PolicyBuilder<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成器を登録する（同名は上書き）
    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn MoveGenerator<B>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// カンマ区切りの名前の列から連鎖を組み立てる
    pub fn build(&self, pipeline: &str) -> Result<PolicyChain<B>, PolicyError> {
        let generators = pipeline
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                let make = self.factories.get(name).ok_or_else(|| PolicyError::UnknownGenerator {
                    name: name.to_string(),
                    known: self.names().collect::<Vec<_>>().join(", "),
                })?;
                Ok::<_, PolicyError>(make())
            })
            .collect::<Result<Vec<_>, _>>()?;
        if generators.is_empty() {
            return Err(PolicyError::EmptyPipeline);
        }
        Ok(PolicyChain::new(generators))
    }
}
