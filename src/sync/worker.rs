// src/sync/worker.rs

//! The check-then-download task run for every listed file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::detector::check_remote;
use super::download::download_file;
use super::http::{file_url, HttpClients};
use super::progress::SyncProgress;
use super::types::{FileInfo, SyncDecision};
use crate::errorlog::ErrorLog;
use crate::ui::render::{checking_line, done_line, transfer_line};
use crate::ui::Theme;

/// Everything a file task needs, shared by all tasks of one device.
pub struct FileTaskContext {
    pub clients: HttpClients,
    pub progress: Arc<SyncProgress>,
    pub errors: Arc<dyn ErrorLog>,
    pub theme: Theme,
    pub dir_url: String,
    pub local_root: PathBuf,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Downloaded,
    Skipped,
    Failed,
}

/// Check `file` against the remote and download it if needed, reporting
/// through `slot`. Failures are logged and end only this file.
pub async fn sync_file(ctx: Arc<FileTaskContext>, file: FileInfo, slot: usize) -> FileOutcome {
    let progress = &ctx.progress;
    let url = file_url(&ctx.dir_url, &file.name);
    let local_path = ctx.local_root.join(&file.name);

    progress.increment_checked();
    progress.set_activity(slot, checking_line(&ctx.theme, &file.name));

    let decision = match check_remote(&ctx.clients.metadata, &url, &local_path).await {
        Ok(d) => d,
        Err(e) => {
            progress.clear_activity(slot);
            ctx.errors.log(&format!("Error checking {}: {:#}", file.name, e));
            return FileOutcome::Failed;
        }
    };

    let remote_size = match decision {
        SyncDecision::Skip => {
            log::debug!("Worker: {} is up to date", file.name);
            progress.increment_skipped();
            progress.clear_activity(slot);
            return FileOutcome::Skipped;
        }
        SyncDecision::Download { remote_size } => remote_size,
    };

    progress.set_activity(slot, transfer_line(&ctx.theme, &file.name, 0, remote_size));

    let result = download_file(
        &ctx.clients.download,
        &url,
        &local_path,
        ctx.idle_timeout,
        |written, total| {
            progress.update_slot(slot, written, transfer_line(&ctx.theme, &file.name, written, total));
        },
    )
    .await;

    match result {
        Ok(outcome) => {
            log::info!("Worker: downloaded {} ({} bytes)", file.name, outcome.bytes);
            progress.finish_download(slot, outcome.bytes, done_line(&ctx.theme, &file.name, outcome.bytes));
            FileOutcome::Downloaded
        }
        Err(e) => {
            progress.fail_slot(slot);
            ctx.errors.log(&format!("Error downloading {}: {:#}", file.name, e));
            FileOutcome::Failed
        }
    }
}
