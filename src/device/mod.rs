//! SCSI Tape Device Model
//!
//! Linux exposes every tape drive as a family of character devices:
//! `st<N>` rewinds on close, `nst<N>` does not, and an optional trailing
//! `a`/`l`/`m` selects an alternate density or compatibility mode.
//! This module classifies those nodes and groups them per physical drive.

pub mod discovery;
pub mod naming;
pub mod probe;
pub mod selection;

pub use discovery::{DevDirSource, DeviceEntry, DeviceSource, Discoverer};
pub use naming::{parse_device_name, ParsedName};
pub use probe::{AccessProbe, ProbeOutcome, ReadAccessProbe};
pub use selection::{select_device, select_from_modes, RewindPreference};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Density/compatibility mode encoded in the device name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSuffix {
    Default,
    Auto,
    Low,
    Medium,
}

impl ModeSuffix {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'a' => Some(Self::Auto),
            'l' => Some(Self::Low),
            'm' => Some(Self::Medium),
            _ => None,
        }
    }

    /// `default`, `a`, `l` or `m`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Auto => "a",
            Self::Low => "l",
            Self::Medium => "m",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Default => "Default (compression enabled)",
            Self::Auto => "Auto-density selection",
            Self::Low => "Low/Legacy density mode",
            Self::Medium => "Medium density mode",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for ModeSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One character device found during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeDeviceNode {
    pub path: PathBuf,
    pub drive_number: u32,
    pub rewinding: bool,
    pub mode: ModeSuffix,
    /// false only when the read-permission check failed
    pub accessible: bool,
}

impl TapeDeviceNode {
    /// Basic nodes carry no mode letter (`st0`, `nst0`)
    pub fn is_basic(&self) -> bool {
        self.mode.is_default()
    }
}

/// All nodes sharing a drive number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalDrive {
    pub drive_number: u32,
    pub rewinding_modes: Vec<TapeDeviceNode>,
    pub non_rewinding_modes: Vec<TapeDeviceNode>,
}

impl PhysicalDrive {
    pub fn new(drive_number: u32) -> Self {
        Self {
            drive_number,
            rewinding_modes: Vec::new(),
            non_rewinding_modes: Vec::new(),
        }
    }

    pub fn modes(&self, preference: RewindPreference) -> &[TapeDeviceNode] {
        match preference {
            RewindPreference::Rewinding => &self.rewinding_modes,
            RewindPreference::NonRewinding => &self.non_rewinding_modes,
        }
    }

    pub(crate) fn push(&mut self, node: TapeDeviceNode) {
        if node.rewinding {
            self.rewinding_modes.push(node);
        } else {
            self.non_rewinding_modes.push(node);
        }
    }

    /// Stable sort so `default` leads each list
    pub(crate) fn sort_modes(&mut self) {
        self.rewinding_modes.sort_by_key(|n| n.mode);
        self.non_rewinding_modes.sort_by_key(|n| n.mode);
    }

    pub fn node_count(&self) -> usize {
        self.rewinding_modes.len() + self.non_rewinding_modes.len()
    }
}

/// Snapshot produced by one scan; rebuilt from scratch on every scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    pub ordered_devices: Vec<PathBuf>,
    pub physical_drives: BTreeMap<u32, PhysicalDrive>,
    pub permission_issues: BTreeSet<PathBuf>,
    pub single_drive_mode: bool,
}

impl DiscoveryResult {
    pub fn is_empty(&self) -> bool {
        self.ordered_devices.is_empty()
    }
}
