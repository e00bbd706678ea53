use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{Config, WriteLogger};
use std::{fs::File, path::PathBuf};

use multi_pane_tail::{
    driver, load_config, pane::DEFAULT_SCROLLBACK, process::DEFAULT_TAIL_BINARY, Options,
};

/// Tail up to four filtered log streams side by side.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON array of `{ "filter"?: string, "title"?: string }` panes
    #[arg(short, long, default_value = "./config.json")]
    config: PathBuf,

    /// Tail binary started as `<binary> --filter <filter>` for each filtered pane
    #[arg(short, long, default_value = DEFAULT_TAIL_BINARY)]
    binary: String,

    /// Lines kept per pane before the oldest are dropped
    #[arg(long, default_value_t = DEFAULT_SCROLLBACK)]
    scrollback: usize,

    /// Write diagnostics here; the terminal itself belongs to the panes
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    WriteLogger::init(args.log_level, Config::default(), file)
        .context("failed to install logger")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let specs = load_config(&args.config)?;
    info!("loaded {} pane(s) from {}", specs.len(), args.config.display());

    let options = Options {
        binary: args.binary,
        scrollback: args.scrollback,
    };
    driver::start(&specs, &options).await
}
