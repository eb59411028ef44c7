// src/sync/manager.rs

//! Main manager for the synchronization process
//!
//! Devices are processed one after another. For each one: fetch the listing,
//! make sure the local directory exists, sweep obsolete files, then run every
//! listed file through the worker pool while a ticker redraws the progress.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::cleaner::sweep_obsolete_files;
use super::detector::needs_sync;
use super::http::HttpClients;
use super::listing::fetch_listing;
use super::pool::WorkerPool;
use super::progress::{ProgressSnapshot, SyncProgress};
use super::types::{FileInfo, SyncOptions};
use super::worker::{sync_file, FileOutcome, FileTaskContext};
use crate::config::{Device, RemoteConfig};
use crate::errorlog::ErrorLog;
use crate::ui::Theme;

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────────────────────";

/// The work planned for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncJob {
    pub dir_url: String,
    pub local_root: PathBuf,
    pub files: Vec<FileInfo>,
    pub remote_names: HashSet<String>,
    /// Sum of listing sizes for files the quick check flags. Best effort only.
    pub total_bytes_estimate: u64,
}

impl SyncJob {
    /// Drop directories and the sentinel file, then estimate the bytes to
    /// move. Names that would escape the local root are kept in
    /// `remote_names`, so cleanup leaves them alone, but never scheduled.
    ///
    /// Stats every listed file, so call it off the async workers.
    pub fn plan(dir_url: &str, local_root: &Path, listing: Vec<FileInfo>, sentinel_file: &str) -> Self {
        let mut files = Vec::new();
        let mut remote_names = HashSet::new();
        let mut total_bytes_estimate = 0;

        for file in listing {
            if file.is_dir() || file.name == sentinel_file {
                continue;
            }
            remote_names.insert(file.name.clone());
            if !is_plain_file_name(&file.name) {
                log::warn!("Manager: not downloading unsafe remote name {:?}", file.name);
                continue;
            }
            if needs_sync(&local_root.join(&file.name), file.size) {
                total_bytes_estimate += file.size;
            }
            files.push(file);
        }

        SyncJob {
            dir_url: dir_url.to_string(),
            local_root: local_root.to_path_buf(),
            files,
            remote_names,
            total_bytes_estimate,
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub progress: ProgressSnapshot,
    pub files_failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<DeviceReport>,
    pub devices_failed: usize,
    pub errors_logged: usize,
}

pub struct SyncManager {
    clients: HttpClients,
    errors: Arc<dyn ErrorLog>,
    options: SyncOptions,
    theme: Theme,
}

impl SyncManager {
    pub fn new(options: SyncOptions, theme: Theme, errors: Arc<dyn ErrorLog>) -> Result<Self> {
        let clients = HttpClients::new(&options).context("Failed to create HTTP clients")?;
        Ok(SyncManager {
            clients,
            errors,
            options,
            theme,
        })
    }

    fn say(&self, line: impl Display) {
        if !self.options.quiet {
            println!("{}", line);
        }
    }

    /// Sync every enabled device in configuration order. A device that cannot
    /// be listed or created locally is logged and skipped.
    pub async fn run(&self, config: &RemoteConfig) -> RunSummary {
        let theme = &self.theme;
        let devices: Vec<&Device> = config.enabled_devices().collect();
        let mut summary = RunSummary::default();

        self.say(theme.bold(theme.paint(
            format!("Starting sync of {} device(s) from {}", devices.len(), config.base_url),
            theme.transfer,
        )));
        self.say(theme.dim(HEAVY_RULE));

        for (i, device) in devices.iter().enumerate() {
            self.say(format!(
                "\n{} {}",
                theme.bold(format!("[{}/{}]", i + 1, devices.len())),
                theme.paint(format!("Syncing: {}", device.remote_path), theme.heading)
            ));
            self.say(theme.dim(LIGHT_RULE));

            match self.sync_device(&config.base_url, device).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    log::warn!("Manager: device {} failed: {:#}", device.remote_path, e);
                    self.errors.log(&format!("Error syncing {}: {:#}", device.remote_path, e));
                    self.say(theme.paint(
                        format!("✗ Error syncing {}: {:#}", device.remote_path, e),
                        theme.failure,
                    ));
                    summary.devices_failed += 1;
                }
            }
        }

        summary.errors_logged = self.errors.count();

        self.say(format!("\n{}", theme.dim(HEAVY_RULE)));
        self.say(theme.paint("✓ Sync(s) completed", theme.success));
        if summary.errors_logged > 0 {
            let location = self
                .errors
                .location()
                .map(|p| format!(" (see {})", p.display()))
                .unwrap_or_default();
            self.say(theme.paint(
                format!("⚠ {} error(s) logged{}", summary.errors_logged, location),
                theme.deleted,
            ));
        }

        summary
    }

    pub async fn sync_device(&self, base_url: &str, device: &Device) -> Result<DeviceReport> {
        let theme = &self.theme;
        let dir_url = device.dir_url(base_url);
        let local_root = device.local_path.as_path();

        let listing = fetch_listing(&self.clients.metadata, &dir_url)
            .await
            .context("Failed to get directory listing")?;

        tokio::fs::create_dir_all(local_root)
            .await
            .with_context(|| format!("Failed to create local directory {}", local_root.display()))?;

        let job = {
            let (dir_url, root, sentinel) =
                (dir_url.clone(), local_root.to_path_buf(), self.options.sentinel_file.clone());
            tokio::task::spawn_blocking(move || SyncJob::plan(&dir_url, &root, listing, &sentinel))
                .await
                .context("Planning task failed")?
        };
        log::info!(
            "Manager: {} files listed at {}, ~{} bytes to fetch",
            job.files.len(),
            job.dir_url,
            job.total_bytes_estimate
        );

        let progress = Arc::new(SyncProgress::new(self.options.max_concurrent));
        progress.set_total_bytes(job.total_bytes_estimate);
        progress.set_active_slots(job.files.len());

        // Cleanup finishes before any download starts so the two never touch
        // the same file.
        let sweep = {
            let (root, names, sentinel) = (
                local_root.to_path_buf(),
                job.remote_names.clone(),
                self.options.sentinel_file.clone(),
            );
            let (progress, errors) = (progress.clone(), self.errors.clone());
            tokio::task::spawn_blocking(move || {
                sweep_obsolete_files(&root, &names, &sentinel, &progress, errors.as_ref())
            })
            .await
            .context("Cleanup task failed")
            .and_then(|r| r)
        };
        match sweep {
            Ok(0) => {}
            Ok(n) => self.say(theme.paint(format!("✓ Cleaned up {} obsolete file(s)", n), theme.deleted)),
            Err(e) => self.errors.log(&format!(
                "Warning: failed to cleanup obsolete files in {}: {:#}",
                local_root.display(),
                e
            )),
        }

        let ticker = if self.options.quiet {
            None
        } else {
            Some(spawn_ticker(progress.clone(), self.theme, self.options.render_interval))
        };

        let files_failed = self.run_pool(job, progress.clone()).await;

        if let Some((stop, handle)) = ticker {
            let _ = stop.send(());
            let _ = handle.await;
            if let Err(e) = progress.render(&mut std::io::stdout().lock(), theme) {
                log::debug!("Manager: final render failed: {}", e);
            }
            println!();
        }

        self.say(theme.paint(format!("\n✓ Sync complete: {}", device.remote_path), theme.success));

        Ok(DeviceReport {
            remote_path: device.remote_path.clone(),
            local_path: device.local_path.clone(),
            progress: progress.snapshot(),
            files_failed,
        })
    }

    /// Submit every file of `job` and wait for all of them. Returns the number
    /// of files that failed.
    async fn run_pool(&self, job: SyncJob, progress: Arc<SyncProgress>) -> usize {
        let ctx = Arc::new(FileTaskContext {
            clients: self.clients.clone(),
            progress,
            errors: self.errors.clone(),
            theme: self.theme,
            dir_url: job.dir_url,
            local_root: job.local_root,
            idle_timeout: self.options.idle_timeout,
        });
        let failed = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(self.options.max_concurrent);

        for file in job.files {
            let ctx = ctx.clone();
            let task_failed = failed.clone();
            let name = file.name.clone();
            let submitted = pool
                .spawn(move |slot| async move {
                    if sync_file(ctx, file, slot).await == FileOutcome::Failed {
                        task_failed.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await;
            if let Err(e) = submitted {
                self.errors.log(&format!("Error scheduling {}: {:#}", name, e));
                failed.fetch_add(1, Ordering::SeqCst);
            }
        }

        let panicked = pool.join().await;
        failed.load(Ordering::SeqCst) + panicked
    }
}

/// Redraw `progress` every `period` until told to stop.
fn spawn_ticker(
    progress: Arc<SyncProgress>,
    theme: Theme,
    period: std::time::Duration,
) -> (oneshot::Sender<()>, JoinHandle<()>) {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = progress.render(&mut std::io::stdout().lock(), &theme) {
                        log::debug!("Manager: render failed: {}", e);
                    }
                }
                _ = &mut stop_rx => break,
            }
        }
    });
    (stop_tx, handle)
}
