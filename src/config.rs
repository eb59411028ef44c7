// Configuration Module
//
// The remote configuration describes where the autoindex lives and which of
// its directories get mirrored to which local folder.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REMOTE_CONFIG: &str = "remote.json";

/// One remote subdirectory mirrored into one local directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Device {
    pub remote_path: String,
    #[serde(default)]
    pub sync: bool,
    pub local_path: PathBuf,
}

impl Device {
    /// Directory URL for this device, always ending in exactly one `/`.
    pub fn dir_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let path = self.remote_path.trim_matches('/');
        if path.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, path)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl RemoteConfig {
    /// Devices flagged for syncing, in configuration order.
    pub fn enabled_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.sync)
    }
}

pub fn load_remote_config(config_path: &Path) -> Result<RemoteConfig> {
    let contents = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let config: RemoteConfig = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
    Ok(config)
}

#[cfg(test)]
pub fn save_remote_config(config: &RemoteConfig, config_path: &Path) -> Result<()> {
    let contents = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(config_path, contents)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
    Ok(())
}
