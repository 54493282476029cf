use clap::Parser;
use ragsync::ingest::IngestRun;
use ragsync::{Config, ManifestStore};

#[derive(Parser, Debug)]
#[command(name = "stats")]
#[command(about = "Summarise the ingestion manifest")]
struct Args {
    /// Also scan the data directory and report pending changes
    #[arg(long)]
    check: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level())).init();

    let manifest = ManifestStore::new(config.manifest_path()).load()?;

    println!("\n=== ragsync Manifest Statistics ===\n");
    println!("{:<24} {}", "Manifest:", config.manifest_path().display());
    println!("{:<24} {}", "Data directory:", config.data_dir().display());
    println!("{:<24} {}", "Tracked files:", manifest.len());

    let processed: Vec<_> = manifest.iter().filter_map(|(_, r)| r.processed_at).collect();
    match (processed.iter().min(), processed.iter().max()) {
        (Some(oldest), Some(newest)) => {
            println!("{:<24} {}", "Oldest processed:", oldest.to_rfc3339());
            println!("{:<24} {}", "Newest processed:", newest.to_rfc3339());
        }
        _ => println!("{:<24} {}", "Processed timestamps:", "none recorded"),
    }
    let untimed = manifest.len() - processed.len();
    if untimed > 0 {
        println!("{:<24} {}", "Without timestamp:", untimed);
    }

    if args.check {
        let plan = IngestRun::from_config(&config)?.plan()?;
        println!("\nPending changes:\n");
        println!("{:-<40}", "");
        println!("{:<24} {:>8}", "New", plan.changes.new.len());
        println!("{:<24} {:>8}", "Modified", plan.changes.modified.len());
        println!("{:<24} {:>8}", "Deleted", plan.changes.deleted.len());
        println!("{:<24} {:>8}", "Unchanged", plan.changes.unchanged);
        println!("{:<24} {:>8}", "Unreadable", plan.unreadable.len());
        println!("{:-<40}", "");
    }

    println!();
    Ok(())
}
