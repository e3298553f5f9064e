use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use extract::TextBudget;
use ingest::OcrLanguage;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command line / environment options. Converted once into [`AppConfig`].
#[derive(Debug, Parser)]
#[command(name = "docreader", version, about = "Watch a directory and file scanned documents into SQLite")]
pub struct Args {
    /// Directory watched for incoming documents
    #[arg(long, env = "DOCREADER_WATCH_DIR")]
    pub watch_dir: PathBuf,

    /// Root of the per-extension archive
    #[arg(long, env = "DOCREADER_ARCHIVE_DIR")]
    pub archive_dir: PathBuf,

    /// Scratch directory for rasterized PDF pages
    #[arg(long, env = "DOCREADER_TEMP_DIR")]
    pub temp_dir: PathBuf,

    /// SQLite database file
    #[arg(long, env = "DOCREADER_DATABASE")]
    pub database: PathBuf,

    /// Directory for log files
    #[arg(long, env = "DOCREADER_LOG_DIR")]
    pub log_dir: PathBuf,

    /// File holding the structuring service API key
    #[arg(long, env = "DOCREADER_API_KEY_FILE")]
    pub api_key_file: Option<PathBuf>,

    /// Structuring service API key (takes precedence over --api-key-file)
    #[arg(long, env = "DOCREADER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "DOCREADER_API_BASE", default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    /// Model used for structuring
    #[arg(long, env = "DOCREADER_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Maximum characters of document text per structuring call
    #[arg(long, env = "DOCREADER_MAX_CHARS", default_value_t = 8192)]
    pub max_chars: usize,

    /// Characters of the budget kept free for instructions
    #[arg(long, env = "DOCREADER_RESERVED_CHARS", default_value_t = 50)]
    pub reserved_chars: usize,

    /// Structuring request timeout in seconds
    #[arg(long, env = "DOCREADER_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// OCR language when detection fails (en, de, zh)
    #[arg(long, env = "DOCREADER_OCR_FALLBACK", default_value = "de")]
    pub ocr_fallback: OcrLanguage,

    /// What to do when a file yields no text
    #[arg(long, env = "DOCREADER_SCAN_POLICY", value_enum, default_value_t = ScanPolicy::AbortScan)]
    pub scan_policy: ScanPolicy,

    /// Scan the watch directory once before waiting for events
    #[arg(long, env = "DOCREADER_STARTUP_SCAN", default_value_t = true, action = clap::ArgAction::Set)]
    pub startup_scan: bool,

    /// Log file format
    #[arg(long, env = "DOCREADER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Reaction to a file whose extraction produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPolicy {
    /// Stop the current scan; remaining files wait for the next event.
    AbortScan,
    /// Leave the file in place and continue with the next one.
    SkipFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathsConfig {
    pub watch_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub database: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructuringConfig {
    pub api_base: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub max_chars: usize,
    pub reserved_chars: usize,
    pub request_timeout_secs: u64,
}

impl StructuringConfig {
    pub fn budget(&self) -> TextBudget {
        TextBudget {
            max_chars: self.max_chars,
            reserved: self.reserved_chars,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Immutable runtime configuration, built once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub structuring: StructuringConfig,
    pub ocr_fallback: OcrLanguage,
    pub scan_policy: ScanPolicy,
    pub startup_scan: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Validate the options and prepare the directories the daemon writes to.
    pub fn from_args(args: Args) -> Result<Self> {
        if !args.watch_dir.is_dir() {
            anyhow::bail!("Watch directory does not exist: {:?}", args.watch_dir);
        }

        for dir in [&args.archive_dir, &args.temp_dir, &args.log_dir] {
            std::fs::create_dir_all(dir)
                .context(format!("Failed to create directory: {:?}", dir))?;
        }

        let api_key = resolve_api_key(args.api_key, args.api_key_file.as_ref())?;

        Ok(Self {
            paths: PathsConfig {
                watch_dir: args.watch_dir,
                archive_dir: args.archive_dir,
                temp_dir: args.temp_dir,
                database: args.database,
                log_dir: args.log_dir,
            },
            structuring: StructuringConfig {
                api_base: args.api_base,
                model: args.model,
                api_key,
                max_chars: args.max_chars,
                reserved_chars: args.reserved_chars,
                request_timeout_secs: args.request_timeout_secs,
            },
            ocr_fallback: args.ocr_fallback,
            scan_policy: args.scan_policy,
            startup_scan: args.startup_scan,
            log_format: args.log_format,
        })
    }
}

/// Load `.env` from the working directory or a parent. A missing file is
/// fine; one that fails to parse is a startup error.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    env_file_loaded(dotenvy::dotenv())
}

fn env_file_loaded<T>(result: dotenvy::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(loaded) => Ok(Some(loaded)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e).context("Failed to load .env file"),
    }
}

fn resolve_api_key(inline: Option<String>, file: Option<&PathBuf>) -> Result<String> {
    let key = match (inline, file) {
        (Some(key), _) => key,
        (None, Some(path)) => std::fs::read_to_string(path)
            .context(format!("Failed to read API key file: {:?}", path))?,
        (None, None) => anyhow::bail!(
            "No structuring credential: set --api-key-file or DOCREADER_API_KEY"
        ),
    };

    let key = key.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("Structuring credential is empty");
    }
    Ok(key)
}
