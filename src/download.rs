//! Release downloads.
//!
//! All fetches go through [`HttpFetcher`] for consistent:
//! - Error handling with full context
//! - Retry logic for transient failures
//! - Checksum verification when the release is pinned

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::recipe::ArtifactFetcher;

/// Default location of uWSGI release tarballs.
pub const DEFAULT_DOWNLOAD_URL: &str = "http://projects.unbit.it/downloads";

/// URL of the `uwsgi-<version>.tar.gz` release under `base_url`.
pub fn release_url(base_url: &str, version: &str) -> String {
    format!("{}/uwsgi-{}.tar.gz", base_url.trim_end_matches('/'), version)
}

/// Download configuration options.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Request timeout (none by default, releases can be slow mirrors)
    pub timeout: Option<Duration>,
    /// Number of retry attempts for transient failures
    pub retries: u32,
    /// Delay before the first retry, doubled on each further attempt
    pub retry_delay: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl DownloadOptions {
    /// Backoff before attempt number `attempt` (1-based retry count).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.retry_delay * (1 << (attempt.saturating_sub(1)).min(4))
    }
}

/// Fetches release archives over HTTP, or copies them from `file://` URLs and
/// plain local paths.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    options: DownloadOptions,
}

impl HttpFetcher {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }

    fn http(&self, url: &str, dest: &Path) -> Result<()> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("uwsgi-recipe/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = self.options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let mut attempt = 0;
        loop {
            match http_attempt(&client, url, dest) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.options.retries && is_retryable_error(&e) => {
                    attempt += 1;
                    let delay = self.options.delay_for(attempt);
                    warn!(
                        "Download of {} failed ({}); retry {}/{} in {:?}",
                        url, e, attempt, self.options.retries, delay
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .with_context(|| format!("Cannot derive a file name from URL {}", url))?;
        let dest = dest_dir.join(file_name);

        fs::create_dir_all(dest_dir)
            .with_context(|| format!("Failed to create directory {}", dest_dir.display()))?;

        info!("Downloading {}", url);
        if let Some(local) = local_source(url) {
            fs::copy(&local, &dest).with_context(|| {
                format!("Failed to copy {} to {}", local.display(), dest.display())
            })?;
        } else {
            self.http(url, &dest)?;
        }
        info!("Downloaded to {}", dest.display());
        Ok(dest)
    }
}

/// Local file behind a `file://` URL or a bare path.
fn local_source(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if url.contains("://") {
        None
    } else {
        Some(PathBuf::from(url))
    }
}

/// Single HTTP download attempt.
fn http_attempt(client: &reqwest::blocking::Client, url: &str, dest: &Path) -> Result<()> {
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("HTTP request failed: {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!(
            "HTTP {} for {}: {}",
            status.as_u16(),
            url,
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }

    let expected = response.content_length();
    let mut file = fs::File::create(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    let written = response
        .copy_to(&mut file)
        .with_context(|| format!("Failed while downloading {}", url))?;

    if let Some(expected) = expected {
        if written != expected {
            let _ = fs::remove_file(dest);
            bail!(
                "Download incomplete for {}: expected {} bytes, got {} bytes",
                url,
                expected,
                written
            );
        }
    }

    Ok(())
}

/// Check if an error is likely transient and worth retrying.
fn is_retryable_error(e: &anyhow::Error) -> bool {
    let msg = format!("{:#}", e).to_lowercase();
    msg.contains("timeout")
        || msg.contains("timed out")
        || msg.contains("connection reset")
        || msg.contains("connection refused")
        || msg.contains("temporarily unavailable")
        || msg.contains("try again")
        || msg.contains("incomplete")
        || msg.contains("http 502")
        || msg.contains("http 503")
        || msg.contains("http 504")
}

/// Verify SHA256 checksum of a file.
///
/// # Errors
/// Returns detailed error with expected vs actual hash.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open {} for checksum", path.display()))?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let actual = format!("{:x}", hasher.finalize());
    if actual != expected.trim().to_lowercase() {
        bail!(
            "Checksum mismatch for {}\n  Expected: {}\n  Actual:   {}",
            path.display(),
            expected,
            actual
        );
    }

    info!("Checksum verified for {}", path.display());
    Ok(())
}
