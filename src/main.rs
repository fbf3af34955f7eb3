//! geostream CLI: stream a GeoJSON document and report ingestion stats.

use anyhow::Result;
use clap::Parser;
use geostream::{
    lock_sink, shared_sink, DualPathLoader, IngestConfig, LoadHooks, MemorySink,
    DEFAULT_CHUNK_SIZE,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "geostream",
    about = "Stream a GeoJSON document, dispatching features as they arrive"
)]
struct Args {
    /// URL (http/https) or local file path
    source: String,

    /// Read size in bytes; also sets the backpressure trim target
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Settle deadline for URL loads, in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let sink = shared_sink(MemorySink::new());
    let loader = DualPathLoader::new(sink.clone(), IngestConfig::with_chunk_size(args.chunk_size))
        .with_settle_timeout(Duration::from_secs(args.timeout));

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let progress_bar = bar.clone();
    let hooks = LoadHooks::new().with_progress(move |sample| {
        if let Some(total) = sample.total_bytes {
            progress_bar.set_length(total);
        }
        progress_bar.set_position(sample.loaded_bytes);
        progress_bar.set_message(format!("{} features", sample.record_count));
    });

    let result = if args.source.starts_with("http://") || args.source.starts_with("https://") {
        loader.load_from_url(&args.source, hooks).await?
    } else {
        loader.load_from_file(&args.source, hooks).await?
    };
    bar.finish_and_clear();

    let rejected = lock_sink(&sink).rejected();
    if rejected > 0 {
        eprintln!("warning: {rejected} record(s) rejected as malformed");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
