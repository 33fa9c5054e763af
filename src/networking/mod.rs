use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::{PatchError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Whole-request bound for small documents (manifest, release feed).
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);
const USER_AGENT: &str = concat!("manifest-patcher/", env!("CARGO_PKG_VERSION"));

/// Snapshot of a single transfer, reported while bytes arrive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransferProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
    pub elapsed: Duration,
    /// Bytes so far divided by time since the transfer started.
    pub bytes_per_sec: f64,
}

impl TransferProgress {
    fn new(downloaded: u64, total: Option<u64>, started: Instant) -> Self {
        let elapsed = started.elapsed();
        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 {
            downloaded as f64 / secs
        } else {
            0.0
        };
        Self {
            downloaded,
            total,
            elapsed,
            bytes_per_sec,
        }
    }
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| PatchError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PatchError::HttpStatus {
                url: url.to_owned(),
                status,
            });
        }
        Ok(response)
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {url}");
        let body = self
            .get(url, Some(METADATA_TIMEOUT))
            .await?
            .bytes()
            .await
            .map_err(|e| PatchError::network(url, e))?;
        Ok(body.to_vec())
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let body = self.fetch_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| PatchError::parse(what, e))
    }

    /// Stream `url` into `dest`, calling `progress` as bytes arrive.
    ///
    /// Bytes already written stay on disk if the transfer fails.
    pub async fn download_to_path<F>(&self, url: &str, dest: &Path, mut progress: F) -> Result<u64>
    where
        F: FnMut(TransferProgress),
    {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PatchError::fs(parent, e))?;
        }

        let started = Instant::now();
        let response = self.get(url, None).await?;
        let total = response.content_length();
        let mut file = File::create(dest)
            .await
            .map_err(|e| PatchError::fs(dest, e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_tick = Instant::now();
        progress(TransferProgress::new(0, total, started));

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PatchError::network(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PatchError::fs(dest, e))?;
            downloaded += chunk.len() as u64;

            if last_tick.elapsed() >= PROGRESS_INTERVAL {
                progress(TransferProgress::new(downloaded, total, started));
                last_tick = Instant::now();
            }
        }

        file.flush().await.map_err(|e| PatchError::fs(dest, e))?;
        progress(TransferProgress::new(downloaded, total, started));

        if let Some(expected) = total
            && downloaded < expected
        {
            return Err(PatchError::Incomplete {
                path: dest.to_path_buf(),
                received: downloaded,
                expected,
            });
        }

        debug!("downloaded {} bytes from {} to {}", downloaded, url, dest.display());
        Ok(downloaded)
    }
}
