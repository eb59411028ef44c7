// src/errorlog.rs

//! Append-only log of isolated failures (per-file, per-device, cleanup).
//!
//! Failures never abort a run; they are written here and surfaced as a count
//! in the final summary.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait ErrorLog: Send + Sync {
    /// Record one failure message.
    fn log(&self, message: &str);
    /// Number of messages recorded so far, including discarded ones.
    fn count(&self) -> usize;
    /// Where the messages end up, if anywhere.
    fn location(&self) -> Option<PathBuf> {
        None
    }
}

struct FileState {
    file: Option<File>,
    count: usize,
}

/// Writes timestamped lines to a file that is only created once the first
/// failure arrives, so clean runs leave nothing behind.
pub struct FileErrorLog {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileErrorLog {
    /// Log file named after the current local time, placed in `dir`.
    pub fn new_in<P: AsRef<Path>>(dir: P) -> Self {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let filename = format!("mirrorsync-errors_{}.log", timestamp);
        Self::with_path(dir.as_ref().join(filename))
    }

    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(FileState {
                file: None,
                count: 0,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ErrorLog for FileErrorLog {
    fn log(&self, message: &str) {
        let mut state = self.state.lock();
        state.count += 1;

        if state.file.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(f) => state.file = Some(f),
                Err(e) => {
                    log::debug!("Error log {} unavailable: {}", self.path.display(), e);
                    return;
                }
            }
        }

        if let Some(f) = state.file.as_mut() {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(f, "[{}] {}", timestamp, message);
        }
    }

    fn count(&self) -> usize {
        self.state.lock().count
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}
