//! プレイアウト速度（kpps: 1秒あたりの千プレイアウト数）の計測

use std::time::Instant;

use anyhow::Result;
use log::debug;
use rgo_core::SearchConfig;
use serde::Serialize;

use crate::selfplay::{GameConfig, new_controller};

/// 計測結果の要約
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub samples: usize,
    pub mean: f64,
    /// 標本標準偏差（n - 1 で割る）。サンプルが1つ以下なら 0
    pub std_dev: f64,
}

pub fn summarize(samples: &[f64]) -> Summary {
    let n = samples.len();
    if n == 0 {
        return Summary { samples: 0, mean: 0.0, std_dev: 0.0 };
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let std_dev = if n < 2 {
        0.0
    } else {
        let sq: f64 = samples.iter().map(|x| (x - mean) * (x - mean)).sum();
        (sq / (n - 1) as f64).sqrt()
    };
    Summary { samples: n, mean, std_dev }
}

/// 初期局面で1回探索し、kpps を返す
///
/// 毎回新しいコントローラを作るので、前回の木は引き継がない。
pub fn measure_kpps(size: usize, config: &SearchConfig) -> Result<f64> {
    let game = GameConfig { size, komi: 7.5, max_moves: 0 };
    let mut controller = new_controller(&game, config.clone())?;
    let started = Instant::now();
    controller.best_move()?;
    let elapsed = started.elapsed().as_secs_f64();
    let playouts = controller.last_stats().playouts;
    debug!("{playouts} playouts in {elapsed:.3} s");
    if elapsed <= 0.0 {
        return Ok(0.0);
    }
    Ok(playouts as f64 / elapsed / 1000.0)
}

/// `warmup` 回捨ててから `runs` 回計測する
pub fn run(size: usize, config: &SearchConfig, warmup: usize, runs: usize) -> Result<Summary> {
    for _ in 0..warmup {
        measure_kpps(size, config)?;
    }
    let samples = (0..runs).map(|_| measure_kpps(size, config)).collect::<Result<Vec<_>>>()?;
    Ok(summarize(&samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgo_core::search::TimeManagement;

    #[test]
    fn test_summarize() {
        let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.samples, 8);
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_degenerate() {
        assert_eq!(summarize(&[]), Summary { samples: 0, mean: 0.0, std_dev: 0.0 });
        assert_eq!(summarize(&[3.5]), Summary { samples: 1, mean: 3.5, std_dev: 0.0 });
    }

    #[test]
    fn test_run_with_playout_cap() {
        let config = SearchConfig {
            threads: 1,
            msec: 0,
            playouts: 50,
            table_size: 10,
            time_management: TimeManagement::Fixed,
            ..SearchConfig::default()
        };
        let summary = run(5, &config, 1, 2).unwrap();
        assert_eq!(summary.samples, 2);
        assert!(summary.mean > 0.0);
    }
}
