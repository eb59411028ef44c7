// src/sync/mod.rs

// Declare sub-modules for sync logic
pub mod cleaner;
pub mod detector;
pub mod download;
pub mod http;
pub mod listing;
pub mod manager;
pub mod pool;
pub mod progress;
pub mod types;
pub mod worker;

pub use manager::{DeviceReport, RunSummary, SyncJob, SyncManager};
pub use types::{FileInfo, SyncDecision, SyncOptions};
