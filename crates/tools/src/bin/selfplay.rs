/// rgo エンジンの自己対局。参照盤面上で1局打ち、棋譜と最終スコアを出力する。
///
/// # 使用例
///
/// - 9路、1手1秒:
///   `cargo run -p tools --release --bin selfplay -- --size 9 --set msec=1000`
///
/// - 設定ファイル + 上書き、JSONL で出力:
///   `cargo run -p tools --release --bin selfplay -- --config search.toml --set threads=4 --json`
///
/// `RUST_LOG=debug` でタイムスライスや sweep の様子が見える。
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tools::config::load_config;
use tools::selfplay::{GameConfig, MoveEvent, new_controller, run_game};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(author, version, about = "rgo selfplay on the reference board")]
struct Cli {
    /// Board size (2..=19)
    #[arg(long, default_value_t = 9)]
    size: usize,

    /// Komi added to White's area
    #[arg(long, default_value_t = 7.5)]
    komi: f64,

    /// Maximum number of moves before the game is scored as is
    #[arg(long, default_value_t = 400)]
    max_moves: u32,

    /// Search configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search property override (format: "name=value", can be specified multiple times)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Emit one JSON object per move and a final result line
    #[arg(long, default_value_t = false)]
    json: bool,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), &cli.set)?;
    info!("search config: {config:?}");
    let game = GameConfig { size: cli.size, komi: cli.komi, max_moves: cli.max_moves };
    let mut controller = new_controller(&game, config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;
    let mut on_move = |event: &MoveEvent| {
        let written = if cli.json {
            serde_json::to_string(event)
                .map_err(io::Error::other)
                .and_then(|line| writeln!(out, "{line}"))
        } else {
            print_move(&mut out, event)
        };
        if let Err(e) = written {
            write_error.get_or_insert(e);
        }
    };
    let result = run_game(&mut controller, &game, &mut on_move)?;
    if let Some(e) = write_error {
        return Err(e).context("failed to write move log");
    }

    if cli.json {
        let line = serde_json::to_string(&result).context("failed to encode result")?;
        writeln!(out, "{line}")?;
    } else {
        writeln!(out, "{}", controller.board())?;
        let winner = result.winner.map_or_else(|| "draw".to_string(), |c| c.to_string());
        writeln!(
            out,
            "result: {winner} ({:?}) after {} moves, score {:+.1}",
            result.reason, result.plies, result.score
        )?;
    }
    Ok(())
}

fn print_move(out: &mut impl Write, event: &MoveEvent) -> io::Result<()> {
    let best = event
        .top
        .first()
        .map(|r| format!(" {:.1}%", r.win_rate() * 100.0))
        .unwrap_or_default();
    writeln!(
        out,
        "{:>4}. {} {:<6} {:>8} playouts {:>6} ms{best}",
        event.ply, event.color, event.mv, event.playouts, event.elapsed_ms
    )
}
