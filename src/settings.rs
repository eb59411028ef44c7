use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::sync::types::SyncOptions;

pub const DEFAULT_LOCAL_CONFIG: &str = "local.json";
pub const DEFAULT_MAX_CONCURRENT: usize = 2;
pub const DEFAULT_SENTINEL_FILE: &str = "systeminfo.txt";

/// Machine-local settings stored as JSON next to the remote config.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LocalSettings {
    /// 0 means "not set".
    pub max_concurrent: usize,
    pub metadata_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub sentinel_file: String,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            metadata_timeout_secs: 30,
            connect_timeout_secs: 30,
            idle_timeout_secs: 90,
            sentinel_file: DEFAULT_SENTINEL_FILE.to_string(),
        }
    }
}

impl LocalSettings {
    /// Load settings if present, otherwise return defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings: Self = serde_json::from_str(&s)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        Ok(settings)
    }

    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;
        Ok(())
    }

    /// Resolve the effective sync options. A CLI override wins over the file,
    /// which wins over the built-in default.
    pub fn to_sync_options(&self, cli_max_concurrent: Option<usize>) -> SyncOptions {
        let max_concurrent = cli_max_concurrent
            .filter(|n| *n > 0)
            .or(Some(self.max_concurrent).filter(|n| *n > 0))
            .unwrap_or(DEFAULT_MAX_CONCURRENT);

        SyncOptions {
            max_concurrent,
            metadata_timeout: Duration::from_secs(self.metadata_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            sentinel_file: self.sentinel_file.clone(),
            ..SyncOptions::default()
        }
    }
}
