// src/sync/download.rs

//! Streaming a remote file body to disk with per-chunk progress.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use filetime::FileTime;
use futures_util::StreamExt;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;

use super::http::{content_length, ensure_ok, last_modified};

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub bytes: u64,
}

/// Download `url` into `local_path`.
///
/// The request status is checked before the local file is touched. After
/// that the file is truncated and written chunk by chunk; `on_progress` is
/// called after every chunk with `(written_so_far, content_length)`. If no
/// chunk arrives within `idle_timeout` the transfer fails. A failed transfer
/// removes the partial file. On success the file's times are set to the
/// remote `Last-Modified`, when the server sent one.
pub async fn download_file<F>(
    client: &reqwest::Client,
    url: &str,
    local_path: &Path,
    idle_timeout: Duration,
    mut on_progress: F,
) -> Result<DownloadOutcome>
where
    F: FnMut(u64, Option<u64>),
{
    log::debug!("Download: GET {} -> {}", url, local_path.display());

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", url))?;
    ensure_ok(response.status())?;

    let total = content_length(response.headers());
    let remote_time = last_modified(response.headers());

    let mut file = tokio::fs::File::create(local_path)
        .await
        .with_context(|| format!("Failed to create {}", local_path.display()))?;

    let written = match stream_body(response, &mut file, idle_timeout, total, &mut on_progress).await {
        Ok(written) => written,
        Err(e) => {
            drop(file);
            let _ = tokio::fs::remove_file(local_path).await;
            return Err(e.context(format!("Failed to download {}", url)));
        }
    };
    drop(file);

    if let Some(remote_time) = remote_time {
        set_times(local_path, remote_time).await;
    }

    Ok(DownloadOutcome { bytes: written })
}

/// Set mtime and atime of `path`. Failure only costs a redundant transfer
/// on the next run, so it is logged and ignored.
async fn set_times(path: &Path, time: DateTime<Utc>) {
    let ft = FileTime::from_system_time(SystemTime::from(time));
    let target = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || filetime::set_file_times(&target, ft, ft)).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Download: could not set times on {}: {}", path.display(), e),
        Err(e) => log::warn!("Download: time update task failed for {}: {}", path.display(), e),
    }
}

async fn stream_body<F>(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    idle_timeout: Duration,
    total: Option<u64>,
    on_progress: &mut F,
) -> Result<u64>
where
    F: FnMut(u64, Option<u64>),
{
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    loop {
        let next = tokio::time::timeout(idle_timeout, stream.next())
            .await
            .map_err(|_| anyhow!("No data received for {:?}", idle_timeout))?;
        let chunk = match next {
            Some(chunk) => chunk.context("Failed to read response body")?,
            None => break,
        };

        file.write_all(&chunk).await.context("Failed to write to local file")?;
        written += chunk.len() as u64;
        on_progress(written, total);
    }

    file.flush().await.context("Failed to flush local file")?;
    Ok(written)
}
