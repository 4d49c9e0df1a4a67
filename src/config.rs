//! Configuration
//!
//! TOML configuration for device scanning, mounting, formatting and
//! diagnostics. Every key has a default so an absent file is valid.

use crate::error::{LtfsAdminError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const APP_DIR: &str = "ltfsadm";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory scanned for `st*` / `nst*` character devices
    pub device_dir: PathBuf,
    pub discovery: DiscoveryConfig,
    pub mount: MountConfig,
    pub format: FormatConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from("/dev"),
            discovery: DiscoveryConfig::default(),
            mount: MountConfig::default(),
            format: FormatConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

/// How `ordered_devices` is assembled from the scanned candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryPolicy {
    /// List every matching node, basic nodes before mode variants
    RankAll,
    /// One canonical node plus any other node that answers `mt status`
    PrimaryWithProbe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub policy: DiscoveryPolicy,
    pub primary_device: Option<PathBuf>,
    pub probe_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            policy: DiscoveryPolicy::RankAll,
            primary_device: None,
            probe_timeout_secs: 5,
        }
    }
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MountConfig {
    pub default_mount_point: PathBuf,
    /// Extra `-o` options appended to every ltfs mount attempt
    pub options: Vec<String>,
    pub rewind_before_mount: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            default_mount_point: PathBuf::from("/mnt/ltfs"),
            options: Vec::new(),
            rewind_before_mount: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatConfig {
    /// Block size passed to mkltfs when sg_inq reports a Quantum drive
    pub quantum_block_size: u32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            quantum_block_size: 65536,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    pub load_settle_secs: u64,
    pub rw_test_megabytes: u32,
    pub log_pages: Vec<String>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            load_settle_secs: 5,
            rw_test_megabytes: 10,
            log_pages: ["0x02", "0x03", "0x06", "0x0c", "0x0d", "0x0e", "0x0f"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Per-user location, e.g. `~/.config/ltfsadm/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// An explicit path must exist; the per-user file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            LtfsAdminError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.discovery.probe_timeout_secs == 0 {
            return Err(LtfsAdminError::config(
                "discovery.probe_timeout_secs must be greater than zero",
            ));
        }
        if self.diagnostics.rw_test_megabytes == 0 {
            return Err(LtfsAdminError::config(
                "diagnostics.rw_test_megabytes must be greater than zero",
            ));
        }
        Ok(())
    }
}
