//! The Downloader (§4.4): HTTP fetch with progress, streaming SHA-256
//! verification, and a content-addressed cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::PoksError;
use crate::paths::filename_from_url;
use crate::reporter::Reporter;

const MAX_ATTEMPTS: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// The cache path for a URL: `cache/<first-8-hex-of-sha256(url)>_<basename>`.
/// Two URLs sharing a filename can't collide; the prefix guarantees
/// uniqueness while keeping names legible.
pub fn cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let prefix = hex::encode(&digest[..4]);
    let basename = filename_from_url(url);
    cache_dir.join(format!("{prefix}_{basename}"))
}

async fn sha256_of_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = tokio::io::AsyncReadExt::read(&mut file, &mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fetch `url` into the content-addressed cache under `cache_dir`,
/// verifying it against `expected_sha256`. Returns the cache path.
///
/// Algorithm (§4.4):
/// 1. If the cache path exists and hashes correctly, return it.
/// 2. Otherwise stream the response to a temp sibling file.
/// 3. Verify; on mismatch delete the temp file and fail.
/// 4. Atomically rename temp → cache path.
///
/// # Errors
///
/// Returns [`PoksError::ChecksumMismatch`] on hash mismatch,
/// [`PoksError::HttpError`] on a non-retryable HTTP status, or
/// [`PoksError::IoError`] on filesystem failure. Concurrent calls for
/// the same cache path are expected to be serialized by the caller's
/// keyed single-flight lock (§5); this function alone is not
/// reentrant-safe against itself.
pub async fn get_cached_or_download(
    client: &Client,
    url: &str,
    expected_sha256: &str,
    cache_dir: &Path,
    app: &str,
    version: &str,
    reporter: &(impl Reporter + ?Sized),
) -> Result<PathBuf, PoksError> {
    tokio::fs::create_dir_all(cache_dir).await?;
    let dest = cache_path(cache_dir, url);

    if dest.is_file() && sha256_of_file(&dest).await? == expected_sha256.to_lowercase() {
        return Ok(dest);
    }

    let tmp = dest.with_extension(format!(
        "tmp-{}",
        std::process::id()
    ));

    download_with_retry(client, url, &tmp, app, version, reporter).await?;

    let actual = sha256_of_file(&tmp).await?;
    if actual != expected_sha256.to_lowercase() {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(PoksError::ChecksumMismatch {
            expected: expected_sha256.to_string(),
            actual,
            url: url.to_string(),
        });
    }

    tokio::fs::rename(&tmp, &dest).await?;
    Ok(dest)
}

async fn download_with_retry(
    client: &Client,
    url: &str,
    tmp: &Path,
    app: &str,
    version: &str,
    reporter: &(impl Reporter + ?Sized),
) -> Result<(), PoksError> {
    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        match download_once(client, url, tmp, app, version, reporter).await {
            Ok(()) => return Ok(()),
            Err(PoksError::HttpError { status, url }) if status != 0 => {
                // A real HTTP response came back (4xx or 5xx): not retryable.
                return Err(PoksError::HttpError { status, url });
            }
            Err(err) => {
                last_err = Some(err);
                if attempt + 1 < MAX_ATTEMPTS {
                    let jitter_ms = rand::rng().random_range(0..250);
                    let backoff = Duration::from_millis(250 * 2u64.pow(attempt) + jitter_ms);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| PoksError::HttpError {
        status: 0,
        url: url.to_string(),
    }))
}

async fn download_once(
    client: &Client,
    url: &str,
    tmp: &Path,
    app: &str,
    version: &str,
    reporter: &(impl Reporter + ?Sized),
) -> Result<(), PoksError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .timeout(CONNECT_TIMEOUT + READ_TIMEOUT)
        .send()
        .await
        .map_err(|e| http_error(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PoksError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let total = response.content_length();
    reporter.downloading(app, version, 0, total);

    let mut file = tokio::fs::File::create(tmp).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| http_error(url, &e))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.downloading(app, version, downloaded, total);
    }
    file.flush().await?;
    Ok(())
}

fn http_error(url: &str, err: &reqwest::Error) -> PoksError {
    if let Some(status) = err.status() {
        PoksError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        }
    } else {
        PoksError::HttpError {
            status: 0,
            url: url.to_string(),
        }
    }
}

/// Delete every entry under `cache_dir`.
///
/// # Errors
///
/// Returns [`PoksError::IoError`] on filesystem failure.
pub async fn clear(cache_dir: &Path) -> Result<(), PoksError> {
    if !cache_dir.exists() {
        return Ok(());
    }
    let mut entries = tokio::fs::read_dir(cache_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        tokio::fs::remove_file(entry.path()).await?;
    }
    Ok(())
}

/// Total size in bytes of every entry under `cache_dir`.
///
/// # Errors
///
/// Returns [`PoksError::IoError`] on filesystem failure.
pub async fn size(cache_dir: &Path) -> Result<u64, PoksError> {
    if !cache_dir.exists() {
        return Ok(0);
    }
    let mut total = 0u64;
    let mut entries = tokio::fs::read_dir(cache_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        total += entry.metadata().await?.len();
    }
    Ok(total)
}
