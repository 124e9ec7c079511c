//! # TVL
//!
//! One-shot command: reads every configured pool, prints the dollar TVL and overwrites the
//! JSON artifact.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin tvl -- --config Config.toml
//! cargo run --bin tvl -- --dry-run
//! ```
//!
//! `RUST_LOG=debug` adds per-pool values and LP virtual prices.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use stableswap_tvl::{output, Settings, TvlOrchestrator};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tvl", about = "Total value locked across the configured stable-swap pools")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, default_value = "Config.toml")]
    config: String,

    /// Overrides `output.path`
    #[arg(long)]
    output: Option<PathBuf>,

    /// Compute and log the TVL without writing the artifact
    #[arg(long)]
    dry_run: bool,
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config))?;
    info!("Settings loaded: {} pools, rpc {}", settings.pools.len(), settings.rpc.url);

    let orchestrator = TvlOrchestrator::from_settings(&settings)?;
    let report = orchestrator.run().await?;

    info!("TVL: ${}", output::format_usd(&report.total)?);

    if args.dry_run {
        info!("Dry run, artifact not written");
        return Ok(());
    }

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&settings.output.path));
    output::write_tvl(&path, &report.total).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("TVL run failed: {:#}", e);
        std::process::exit(1);
    }
}
