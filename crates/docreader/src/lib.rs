pub mod archive;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod metrics;
pub mod shutdown;
pub mod watcher;

pub use config::{AppConfig, Args, LogFormat, ScanPolicy};
pub use dispatch::{Dispatcher, run};
pub use metrics::{FileOutcome, ScanReport};
pub use watcher::DirectoryWatcher;
