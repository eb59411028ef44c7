// src/sync/detector.rs

//! Decides whether a local file is missing or stale.
//!
//! `needs_sync` is a local-only heuristic used to estimate the bytes a run
//! will move. `check_remote` issues a HEAD request and is what actually gates
//! a download.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::Path;

use super::http::{content_length, ensure_ok, last_modified};
use super::types::SyncDecision;

/// True if the local file is absent, unreadable or of a different size.
pub fn needs_sync(local_path: &Path, remote_size: u64) -> bool {
    match std::fs::metadata(local_path) {
        Ok(meta) => meta.len() != remote_size,
        Err(_) => true,
    }
}

pub async fn check_remote(
    client: &reqwest::Client,
    file_url: &str,
    local_path: &Path,
) -> Result<SyncDecision> {
    let local = match tokio::fs::metadata(local_path).await {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to stat {}", local_path.display()));
        }
    };

    let response = client
        .head(file_url)
        .send()
        .await
        .with_context(|| format!("Failed to send HEAD request to {}", file_url))?;
    ensure_ok(response.status())?;

    let headers = response.headers();
    let remote_size = content_length(headers);

    let local = match local {
        Some(meta) => meta,
        None => return Ok(SyncDecision::Download { remote_size }),
    };

    if remote_size != Some(local.len()) {
        log::debug!(
            "Detector: size mismatch for {} (local {}, remote {:?})",
            local_path.display(),
            local.len(),
            remote_size
        );
        return Ok(SyncDecision::Download { remote_size });
    }

    if let (Some(remote_time), Ok(local_time)) = (last_modified(headers), local.modified()) {
        let local_time: DateTime<Utc> = local_time.into();
        if remote_time > local_time {
            log::debug!(
                "Detector: remote copy of {} is newer ({} > {})",
                local_path.display(),
                remote_time,
                local_time
            );
            return Ok(SyncDecision::Download { remote_size });
        }
    }

    Ok(SyncDecision::Skip)
}
