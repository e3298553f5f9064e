use anyhow::{Context, Result};
use clap::Parser;
use docreader::{AppConfig, Args, DirectoryWatcher, Dispatcher, config, logging, shutdown};
use extract::ChatClient;
use index::DocumentStore;
use ingest::{Extractor, ExtractorConfig};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let env_file = config::load_dotenv()?;

    let args = Args::parse();
    let config = AppConfig::from_args(args)?;

    let log_path = logging::init(&config.paths.log_dir, config.log_format)?;
    info!(
        log_file = %log_path.display(),
        config = %serde_json::to_string(&config).unwrap_or_default(),
        "Starting docreader"
    );
    if let Some(path) = &env_file {
        info!(path = %path.display(), "Loaded environment file");
    }

    // Installed before the startup scan so an early Ctrl-C is not fatal
    let interrupted = shutdown::interrupt().await;

    let store = DocumentStore::open(&config.paths.database)?;

    let extractor = Extractor::with_system_tools(ExtractorConfig {
        temp_dir: config.paths.temp_dir.clone(),
        fallback_language: config.ocr_fallback,
    });

    let structuring = &config.structuring;
    let structurer = ChatClient::new(
        structuring.api_base.clone(),
        structuring.model.clone(),
        structuring.api_key.clone(),
        structuring.budget(),
        structuring.timeout(),
    )?;

    let mut watcher = DirectoryWatcher::start(&config.paths.watch_dir)?;
    let dispatcher = Dispatcher::new(&config, extractor, Box::new(structurer), store);

    docreader::run(&dispatcher, &mut watcher, interrupted).await;

    let store = dispatcher.into_store();
    match store.counts() {
        Ok(counts) => info!(?counts, "Final table counts"),
        Err(e) => error!(error = %e, "Failed to count rows"),
    }
    store.close().context("Failed to close database on shutdown")?;

    info!("Stopped");
    Ok(())
}
