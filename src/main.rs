use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dedupx_core::Record;
use dedupx_engine::{EngineConfig, MatchingEngine};
use dedupx_store::DedupKeyStore;

/// Rule-driven record matching with stable DeDup IDs
#[derive(Parser, Debug)]
#[command(name = "dedupx")]
#[command(about = "Deterministic record matching and identity resolution", long_about = None)]
struct Args {
    /// Input records, one JSON object per line
    #[arg(short, long)]
    input: PathBuf,

    /// Output path for matched records (JSONL); stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the persistent DeDup key store
    #[arg(short, long, default_value = "./data/dedup_store.json")]
    store: PathBuf,

    /// Optional engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting DedupX v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => {
            info!("Configuration: {:?}", path);
            EngineConfig::from_path(path)?
        }
        None => EngineConfig::default(),
    };

    info!("Store: {:?}", args.store);
    let store = Arc::new(DedupKeyStore::open(&args.store, config.fingerprint.clone())?);
    let engine = MatchingEngine::new(config, store)?;

    let records = read_batch(&args.input)?;
    info!("Loaded {} records from {:?}", records.len(), args.input);

    let output = engine.run(&records)?;

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            for record in &output.records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            info!("Wrote {} records to {:?}", output.records.len(), path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            for record in &output.records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
    }

    info!(
        "Run complete: {} matched existing, {} new DeDup keys",
        output.stats.matched_existing, output.stats.new_keys
    );

    Ok(())
}

fn read_batch(path: &PathBuf) -> anyhow::Result<Vec<Record>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("line {}: {}", line_no + 1, e))?;
        records.push(record);
    }
    Ok(records)
}
