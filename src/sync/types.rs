// src/sync/types.rs

use std::time::Duration;

use crate::settings::{DEFAULT_MAX_CONCURRENT, DEFAULT_SENTINEL_FILE};

/// One entry of a remote directory listing. `size` is the listing's
/// human-readable size converted to bytes, 0 when it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        FileInfo {
            name: name.into(),
            size,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Outcome of the HEAD-based staleness check for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Local copy missing or stale. Carries the remote `Content-Length` if sent.
    Download { remote_size: Option<u64> },
    Skip,
}

/// Knobs for one orchestration run. Built from the local settings and the
/// command line; nothing in the sync core reads globals.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub max_concurrent: usize,
    pub metadata_timeout: Duration,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    /// File published in every remote directory that is never mirrored or deleted.
    pub sentinel_file: String,
    pub render_interval: Duration,
    /// Skip live progress drawing and banners.
    pub quiet: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            metadata_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
            sentinel_file: DEFAULT_SENTINEL_FILE.to_string(),
            render_interval: Duration::from_secs(1),
            quiet: false,
        }
    }
}
