use crate::config::LogFormat;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Name of the log file for a run started at `started`.
pub fn log_file_name(started: chrono::DateTime<chrono::Local>) -> String {
    format!("docreader_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Send all tracing output to a fresh timestamped file in `log_dir`.
/// The level defaults to `info` and can be changed through `RUST_LOG`.
pub fn init(log_dir: &Path, format: LogFormat) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .context(format!("Failed to create log directory: {:?}", log_dir))?;

    let path = log_dir.join(log_file_name(chrono::Local::now()));
    let file = File::create(&path).context(format!("Failed to create log file: {:?}", path))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file));

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let started = chrono::Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(log_file_name(started), "docreader_20240309_070501.log");
    }
}
