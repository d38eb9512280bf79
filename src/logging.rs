//! Tracing subscriber setup.
//!
//! Logs go to the configured file when one is set so the terminal view stays
//! clean; otherwise to stderr.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{AssistantConfig, DEFAULT_LOG_FILTER};

pub fn init_logging(config: &AssistantConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match config.log_file.as_deref() {
        Some(path) => {
            let log_file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
