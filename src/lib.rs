//! Canvass: a resumable mirror for tree-shaped JSON election datasets
//!
//! This crate walks a remote hierarchy of JSON documents, storing every node
//! under a directory named after its tier, then harvests the flat result and
//! contest documents referenced from the lowest tier. Network concurrency is
//! bounded by a fixed worker pool and every download is idempotent, so an
//! interrupted run can simply be started again.

pub mod config;
pub mod crawler;
pub mod layout;
pub mod output;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Canvass operations
#[derive(Debug, Error)]
pub enum CanvassError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Setup failed for {}: {source}", path.display())]
    Setup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker pool closed before all jobs were submitted")]
    PoolClosed,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while ensuring a local copy of a remote document
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Error downloading {path}: {status}")]
    Status { path: String, status: String },

    #[error("Empty response for {path}")]
    EmptyResponse { path: String },

    #[error("Empty body for {path}, partial file removed")]
    EmptyBody { path: String },

    #[error("Transport error for {path}: {source}")]
    Transport {
        path: String,
        source: reqwest::Error,
    },

    #[error("IO error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised while reading a structural node from disk
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}, file removed: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unexpected document shape in {}: {message}", path.display())]
    Schema { path: PathBuf, message: String },
}

/// Result type alias for Canvass operations
pub type Result<T> = std::result::Result<T, CanvassError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run, Fetcher, FetchOutcome, RunOptions};
pub use layout::Layout;
pub use output::RunSummary;
