//! プレイアウト速度のベンチマーク
//!
//! 初期局面で `--runs` 回探索し、kpps（1秒あたりの千プレイアウト数）の
//! 平均と標準偏差を表示する。
//!
//! `cargo run -p tools --release --bin mcts_bench -- --runs 10 --msec 1000 --threads 4`

use anyhow::{Result, ensure};
use clap::Parser;
use rgo_core::SearchConfig;
use rgo_core::search::TimeManagement;
use tools::bench;

#[derive(Parser, Debug)]
#[command(author, version, about = "rgo playout throughput benchmark")]
struct Cli {
    /// Number of measured searches
    #[arg(long, default_value_t = 5)]
    runs: usize,

    /// Searches discarded before measuring
    #[arg(long, default_value_t = 1)]
    warmup: usize,

    /// Search time per run in milliseconds
    #[arg(long, default_value_t = 1000)]
    msec: u64,

    /// Worker threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Board size
    #[arg(long, default_value_t = 9)]
    size: usize,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    ensure!(cli.runs > 0, "--runs must be at least 1");
    ensure!(cli.msec > 0, "--msec must be at least 1");

    let config = SearchConfig {
        threads: cli.threads,
        msec: cli.msec,
        time_management: TimeManagement::Fixed,
        ..SearchConfig::default()
    };
    config.validate()?;

    if !cli.json {
        println!(
            "=== rgo MCTS benchmark: {}x{} board, {} thread(s), {} ms x {} runs ===",
            cli.size, cli.size, cli.threads, cli.msec, cli.runs
        );
    }
    let summary = bench::run(cli.size, &config, cli.warmup, cli.runs)?;
    if cli.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("kpps: mean {:.2}, std dev {:.2}", summary.mean, summary.std_dev);
    }
    Ok(())
}
