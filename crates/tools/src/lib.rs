//! rgo エンジンを動かすツール群（自己対局・ベンチマーク）

pub mod bench;
pub mod config;
pub mod selfplay;
