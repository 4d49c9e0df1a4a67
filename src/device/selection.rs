//! Device selection policy
//!
//! Turns a discovery snapshot plus the operator's rewind/mode preference into
//! a single device path. Plain string ordering would put `nst0a` ahead of
//! `nst0` on some kernels; the fallback chain below always prefers the
//! default-mode node when no mode was asked for.

use super::naming::ends_with_mode_letter;
use super::{DiscoveryResult, PhysicalDrive, TapeDeviceNode};
use crate::error::{LtfsAdminError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewindPreference {
    #[default]
    Rewinding,
    NonRewinding,
}

/// Pick a device node for `drive` (or the only / lowest-numbered drive).
pub fn select_device(
    discovery: &DiscoveryResult,
    drive: Option<u32>,
    preference: RewindPreference,
    explicit_mode: Option<&str>,
) -> Result<PathBuf> {
    let physical = resolve_drive(discovery, drive)?;
    let modes = physical.modes(preference);

    select_from_modes(modes, explicit_mode)
        .map(|node| {
            debug!(
                "Selected {} (drive {}, mode {})",
                node.path.display(),
                node.drive_number,
                node.mode
            );
            node.path.clone()
        })
        .ok_or_else(|| {
            LtfsAdminError::no_device(format!(
                "drive {} has no {:?} device nodes",
                physical.drive_number, preference
            ))
        })
}

fn resolve_drive(discovery: &DiscoveryResult, drive: Option<u32>) -> Result<&PhysicalDrive> {
    match drive {
        Some(number) => discovery
            .physical_drives
            .get(&number)
            .ok_or_else(|| LtfsAdminError::no_device(format!("tape drive {} not found", number))),
        None => discovery
            .physical_drives
            .values()
            .next()
            .ok_or_else(|| LtfsAdminError::no_device("no tape drives detected")),
    }
}

/// Fallback chain over one mode list; `None` only when the list is empty.
pub fn select_from_modes<'a>(
    modes: &'a [TapeDeviceNode],
    explicit_mode: Option<&str>,
) -> Option<&'a TapeDeviceNode> {
    if let Some(wanted) = explicit_mode {
        if let Some(node) = modes.iter().find(|n| n.mode.as_str() == wanted) {
            return Some(node);
        }
        debug!("Requested mode {} not available, using fallback", wanted);
    }

    modes
        .iter()
        .find(|n| n.mode.is_default())
        .or_else(|| {
            modes.iter().find(|n| {
                n.path
                    .file_name()
                    .map(|name| !ends_with_mode_letter(&name.to_string_lossy()))
                    .unwrap_or(false)
            })
        })
        .or_else(|| modes.first())
}
