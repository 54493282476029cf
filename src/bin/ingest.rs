use anyhow::Result;
use clap::Parser;
use ragsync::ingest::{IngestRun, MarkProcessed};
use ragsync::Config;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Detect new, modified and deleted documents since the last ingestion run")]
struct Args {
    /// Schedule every file, ignoring stored hashes
    #[arg(short, long)]
    force: bool,

    /// Record the change set in the manifest (files were processed out of band)
    #[arg(short, long)]
    commit: bool,

    /// Print the change set as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    log::info!("Starting ragsync ingestion check");
    log::info!("Data directory: {}", config.data_dir().display());
    log::info!("Manifest path: {}", config.manifest_path().display());

    let run = IngestRun::from_config(&config)?;
    let start = Instant::now();

    let plan = if args.force {
        log::info!("Mode: full re-ingestion (all files)");
        run.plan_forced()?
    } else {
        run.plan()?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan.changes)?);
    }

    if plan.changes.is_empty() {
        log::info!("No new, modified or deleted files. Manifest is up to date.");
        return Ok(());
    }

    for path in &plan.changes.new {
        log::info!("  + {}", path);
    }
    for path in &plan.changes.modified {
        log::info!("  ~ {}", path);
    }
    for path in &plan.changes.deleted {
        log::info!("  - {}", path);
    }

    if !args.commit {
        log::info!("Run with --commit to record these changes in the manifest.");
        return Ok(());
    }

    let report = run.execute_plan(plan, &mut MarkProcessed)?;

    log::info!("=== Ingestion Complete ===");
    log::info!("  New: {}", report.new);
    log::info!("  Modified: {}", report.modified);
    log::info!("  Deleted: {}", report.deleted);
    log::info!("  Unchanged (skipped): {}", report.unchanged);
    log::info!("Manifest written: {}", report.saved);
    log::info!("Time: {:?}", start.elapsed());

    if !report.unreadable.is_empty() {
        log::warn!("Unreadable files (treated as absent): {}", report.unreadable.join(", "));
    }

    Ok(())
}
