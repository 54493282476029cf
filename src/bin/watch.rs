//! Watch the data directory; re-check (or record) changes whenever files settle.

use anyhow::Result;
use clap::Parser;
use ragsync::ingest::IngestRun;
use ragsync::watch::run_watcher;
use ragsync::Config;

#[derive(Parser, Debug)]
#[command(name = "watch")]
#[command(about = "Watch the data directory and re-run change detection on every change")]
struct Args {
    /// Debounce delay in milliseconds before processing a batch of changes
    #[arg(long, default_value = "500")]
    debounce_ms: u64,

    /// Record detected changes in the manifest
    #[arg(short, long)]
    commit: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.log_level()),
    )
    .init();

    log::info!("Starting ragsync file watcher");
    log::info!("Data directory: {}", config.data_dir().display());
    log::info!("Debounce: {} ms", args.debounce_ms);

    let run = IngestRun::from_config(&config)?;

    log::info!("Watching for changes (Ctrl+C to stop)");
    run_watcher(&run, args.debounce_ms, args.commit)?;
    Ok(())
}
