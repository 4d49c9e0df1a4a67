//! Tape Device Discovery
//!
//! Scans the device directory for `st*`/`nst*` character devices, checks each
//! node for read permission and assembles a [`DiscoveryResult`]. A scan never
//! fails: unreadable directories and probe errors only degrade the result.

use super::naming::parse_device_name;
use super::probe::{AccessProbe, ReadAccessProbe};
use super::{DiscoveryResult, PhysicalDrive, TapeDeviceNode};
use crate::config::{Config, DiscoveryConfig, DiscoveryPolicy};
use crate::runner::{CommandLine, CommandRunner};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A directory entry as seen by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: String,
    pub is_char_device: bool,
}

impl DeviceEntry {
    pub fn char_device<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            is_char_device: true,
        }
    }
}

pub trait DeviceSource: Send + Sync {
    /// Directory that entry names are relative to
    fn root(&self) -> &Path;
    fn entries(&self) -> io::Result<Vec<DeviceEntry>>;
}

/// Reads a real device directory such as `/dev`
#[derive(Debug, Clone)]
pub struct DevDirSource {
    dir: PathBuf,
}

impl DevDirSource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeviceSource for DevDirSource {
    fn root(&self) -> &Path {
        &self.dir
    }

    fn entries(&self) -> io::Result<Vec<DeviceEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry in {}: {}", self.dir.display(), e);
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follow symlinks, as udev aliases may point at the real node
            let is_char_device = std::fs::metadata(entry.path())
                .map(|m| m.file_type().is_char_device())
                .unwrap_or(false);
            entries.push(DeviceEntry {
                name,
                is_char_device,
            });
        }
        Ok(entries)
    }
}

pub struct Discoverer {
    source: Box<dyn DeviceSource>,
    probe: Box<dyn AccessProbe>,
    runner: Arc<dyn CommandRunner>,
    config: DiscoveryConfig,
}

impl Discoverer {
    /// Production discoverer over `config.device_dir`
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_parts(
            Box::new(DevDirSource::new(config.device_dir.clone())),
            Box::new(ReadAccessProbe),
            runner,
            config.discovery.clone(),
        )
    }

    pub fn with_parts(
        source: Box<dyn DeviceSource>,
        probe: Box<dyn AccessProbe>,
        runner: Arc<dyn CommandRunner>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            source,
            probe,
            runner,
            config,
        }
    }

    pub async fn discover(&self) -> DiscoveryResult {
        info!("Scanning {} for tape devices", self.source.root().display());

        let (mut candidates, permission_issues) = self.scan_candidates();
        candidates.sort_by_key(rank);

        let accepted = match self.config.policy {
            DiscoveryPolicy::RankAll => candidates,
            DiscoveryPolicy::PrimaryWithProbe => self.admit_by_probe(candidates).await,
        };

        let result = DiscoveryResult::from_nodes(accepted, permission_issues);
        info!(
            "Found {} tape device nodes on {} physical drive(s)",
            result.ordered_devices.len(),
            result.physical_drives.len()
        );
        if !result.permission_issues.is_empty() {
            warn!(
                "Permission denied on {} device node(s)",
                result.permission_issues.len()
            );
        }
        result
    }

    /// Matching char devices plus the set of nodes that failed the read check
    fn scan_candidates(&self) -> (Vec<TapeDeviceNode>, BTreeSet<PathBuf>) {
        let entries = match self.source.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Cannot read device directory {}: {}",
                    self.source.root().display(),
                    e
                );
                return (Vec::new(), BTreeSet::new());
            }
        };

        let mut nodes: Vec<TapeDeviceNode> = Vec::new();
        let mut permission_issues = BTreeSet::new();

        for entry in entries.into_iter().filter(|e| e.is_char_device) {
            let Some(parsed) = parse_device_name(&entry.name) else {
                continue;
            };
            let path = self.source.root().join(&entry.name);
            if nodes.iter().any(|n| n.path == path) {
                continue;
            }
            let accessible = self.probe.probe(&path).is_accessible();
            if !accessible {
                permission_issues.insert(path.clone());
            }
            nodes.push(TapeDeviceNode {
                path,
                drive_number: parsed.drive_number,
                rewinding: parsed.rewinding,
                mode: parsed.mode,
                accessible,
            });
        }

        (nodes, permission_issues)
    }

    /// Keep one canonical node unconditionally; every other node must answer
    /// a bounded `mt status` to be listed. Nodes without read permission skip
    /// the status probe and stay listed so the permission warning names only
    /// devices the user can see.
    async fn admit_by_probe(&self, mut ranked: Vec<TapeDeviceNode>) -> Vec<TapeDeviceNode> {
        if ranked.is_empty() {
            return ranked;
        }

        let configured = self
            .config
            .primary_device
            .as_ref()
            .and_then(|p| ranked.iter().position(|n| n.path == *p));
        if self.config.primary_device.is_some() && configured.is_none() {
            warn!("Configured primary device not found, falling back to first basic node");
        }
        let primary_index = configured
            .or_else(|| ranked.iter().position(|n| n.is_basic() && n.rewinding))
            .unwrap_or(0);

        let primary = ranked.remove(primary_index);
        debug!("Primary tape device: {}", primary.path.display());

        let mut accepted = vec![primary];
        for node in ranked {
            if !node.accessible {
                debug!("Listing {} without status probe", node.path.display());
                accepted.push(node);
            } else if self.status_probe(&node.path).await {
                accepted.push(node);
            } else {
                debug!("Skipping unresponsive device {}", node.path.display());
            }
        }
        accepted
    }

    async fn status_probe(&self, path: &Path) -> bool {
        let command = CommandLine::new("mt")
            .arg("-f")
            .arg(path.to_string_lossy())
            .arg("status")
            .timeout(self.config.probe_timeout());
        self.runner.run(&command).await.succeeded
    }
}

/// Basic rewinding, basic non-rewinding, variant rewinding, variant
/// non-rewinding; then drive number and mode within each group.
fn rank(node: &TapeDeviceNode) -> (u8, u32, super::ModeSuffix) {
    let group = match (node.is_basic(), node.rewinding) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    };
    (group, node.drive_number, node.mode)
}

impl DiscoveryResult {
    /// Assemble a result from nodes already in priority order.
    pub fn from_nodes(nodes: Vec<TapeDeviceNode>, permission_issues: BTreeSet<PathBuf>) -> Self {
        let ordered_devices = nodes.iter().map(|n| n.path.clone()).collect();

        let mut physical_drives: BTreeMap<u32, PhysicalDrive> = BTreeMap::new();
        for node in nodes {
            physical_drives
                .entry(node.drive_number)
                .or_insert_with(|| PhysicalDrive::new(node.drive_number))
                .push(node);
        }
        for drive in physical_drives.values_mut() {
            drive.sort_modes();
        }

        let single_drive_mode = physical_drives.len() == 1;
        Self {
            ordered_devices,
            physical_drives,
            permission_issues,
            single_drive_mode,
        }
    }
}
