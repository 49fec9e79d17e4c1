//! Tool configuration.
//!
//! Defaults come from environment variables (a `.env` file is loaded first by
//! the binary); command-line flags override them.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::download::{DownloadOptions, DEFAULT_DOWNLOAD_URL};

/// Buildout file read when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "buildout.cfg";
/// Part built when nothing else is given.
pub const DEFAULT_PART: &str = "uwsgi";

pub const ENV_CONFIG: &str = "UWSGI_RECIPE_CONFIG";
pub const ENV_PART: &str = "UWSGI_RECIPE_PART";
pub const ENV_DOWNLOAD_URL: &str = "UWSGI_DOWNLOAD_URL";
pub const ENV_DOWNLOAD_RETRIES: &str = "UWSGI_DOWNLOAD_RETRIES";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "UWSGI_DOWNLOAD_TIMEOUT";
pub const ENV_MAKE: &str = "UWSGI_MAKE";

/// Build tool used when nothing else is given.
pub const DEFAULT_MAKE: &str = "make";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Buildout configuration file
    pub config_file: PathBuf,
    /// Section naming the part to install
    pub part: String,
    /// Base URL of release tarballs, unless the part sets `download-url`
    pub download_url: String,
    /// Retries for transient download failures
    pub download_retries: u32,
    /// Per-request download timeout in seconds
    pub download_timeout: Option<u64>,
    /// `make` executable used for the build
    pub make_program: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| {
            non_empty(key).and_then(|v| match v.trim().parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!("Ignoring {}={:?}: not a number", key, v);
                    None
                }
            })
        };
        let defaults = DownloadOptions::default();

        Self {
            config_file: non_empty(ENV_CONFIG)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
            part: non_empty(ENV_PART).unwrap_or_else(|| DEFAULT_PART.to_string()),
            download_url: non_empty(ENV_DOWNLOAD_URL)
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_URL.to_string()),
            download_retries: number(ENV_DOWNLOAD_RETRIES)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(defaults.retries),
            download_timeout: number(ENV_DOWNLOAD_TIMEOUT).filter(|&secs| secs > 0),
            make_program: non_empty(ENV_MAKE).unwrap_or_else(|| DEFAULT_MAKE.to_string()),
        }
    }

    /// Fetcher settings derived from this configuration.
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            retries: self.download_retries,
            timeout: self.download_timeout.map(Duration::from_secs),
            ..DownloadOptions::default()
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, config_file: Option<PathBuf>, part: Option<String>) -> Self {
        if let Some(config_file) = config_file {
            self.config_file = config_file;
        }
        if let Some(part) = part {
            self.part = part;
        }
        self
    }
}
