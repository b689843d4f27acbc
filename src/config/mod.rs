//! Configuration module for Canvass
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file (or no file at all) describes a
//! complete crawl of the default remote.
//!
//! # Example
//!
//! ```no_run
//! use canvass::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("canvass.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ChildPathShape, Config, CrawlerConfig, OutputConfig, RemoteConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
