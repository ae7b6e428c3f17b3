//! Errors that end a scrape run.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Timeout: playlist element not found on {url} after {}s", .timeout.as_secs())]
    LoadTimeout { url: String, timeout: Duration },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Browser error: {0}")]
    Browser(#[from] anyhow::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
