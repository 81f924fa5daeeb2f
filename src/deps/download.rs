//! Source archive downloads.
//!
//! Transient network failures are retried with exponential backoff. The
//! archive is written to a `.part` file and renamed into place only once
//! complete, so an interrupted download never looks like a cached archive.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;

pub use checksum::{sha256_file, verify_sha256};

/// Download configuration options.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Request timeout (default: none, archives can be large)
    pub timeout: Option<Duration>,
    /// Number of retry attempts for transient failures (default: 3)
    pub retries: u32,
    /// Delay between retries (default: 2 seconds, doubles each retry)
    pub retry_delay: Duration,
    /// Whether to show progress (default: true)
    pub show_progress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            retries: 3,
            retry_delay: Duration::from_secs(2),
            show_progress: true,
        }
    }
}

/// Download a file via HTTP.
pub async fn http(url: &str, dest: &Path, options: &DownloadOptions) -> Result<()> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("sdport/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let mut attempt = 0;
    loop {
        if attempt > 0 {
            // Exponential backoff, max 16x
            let delay = options.retry_delay * (1 << (attempt - 1).min(4));
            if options.show_progress {
                println!("    Retry {}/{} in {:?}...", attempt, options.retries, delay);
            }
            tokio::time::sleep(delay).await;
        }
        attempt += 1;

        match http_attempt(&client, url, dest, options).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                if !is_retryable_error(&e) || attempt > options.retries {
                    return Err(e);
                }
                eprintln!("    [WARN] {:#}", e);
            }
        }
    }
}

/// Single HTTP download attempt.
async fn http_attempt(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    options: &DownloadOptions,
) -> Result<()> {
    let mut request = client.get(url);
    if let Some(timeout) = options.timeout {
        request = request.timeout(timeout);
    }

    let response = request
        .send()
        .await
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

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let part = dest.with_extension("part");
    let written = match write_part(response, url, &part, options).await {
        Ok(()) => tokio::fs::rename(&part, dest)
            .await
            .with_context(|| format!("Failed to move {} into place", part.display())),
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&part).await;
    }
    written
}

/// Stream a response body into `part`, checking the advertised length.
async fn write_part(
    response: reqwest::Response,
    url: &str,
    part: &Path,
    options: &DownloadOptions,
) -> Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let total = response.content_length();
    let file = tokio::fs::File::create(part)
        .await
        .with_context(|| format!("Failed to create {}", part.display()))?;
    let mut writer = tokio::io::BufWriter::new(file);

    let mut downloaded = 0u64;
    let mut last_percent = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read chunk from {}", url))?;
        writer
            .write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", part.display()))?;
        downloaded += chunk.len() as u64;

        if options.show_progress {
            if let Some(total) = total.filter(|t| *t > 0) {
                let percent = downloaded * 100 / total;
                if percent >= last_percent + 10 {
                    println!(
                        "    {:.1}/{:.1} MB ({}%)",
                        downloaded as f64 / 1048576.0,
                        total as f64 / 1048576.0,
                        percent
                    );
                    last_percent = percent;
                }
            }
        }
    }

    writer
        .flush()
        .await
        .with_context(|| format!("Failed to flush {}", part.display()))?;

    if let Some(total) = total {
        if downloaded != total {
            bail!(
                "Download incomplete for {}: expected {} bytes, got {} bytes",
                url,
                total,
                downloaded
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
        || msg.contains("incomplete")
        || msg.contains("http 502")
        || msg.contains("http 503")
        || msg.contains("http 504")
}

pub mod checksum {
    use anyhow::{bail, Context, Result};
    use sha2::{Digest, Sha256};
    use std::io::Read;
    use std::path::Path;

    /// SHA-256 of a file as lowercase hex.
    pub fn sha256_file(path: &Path) -> Result<String> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {} for checksum", path.display()))?;
        let mut reader = std::io::BufReader::with_capacity(1024 * 1024, file);
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Verify SHA256 checksum of a file.
    ///
    /// # Errors
    /// Returns detailed error with expected vs actual hash.
    pub fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
        let actual = sha256_file(path)?;
        if actual != expected.to_lowercase() {
            bail!(
                "Checksum mismatch for {}\n  Expected: {}\n  Actual:   {}",
                path.display(),
                expected,
                actual
            );
        }
        Ok(())
    }
}
