use super::{LtfsMount, TapeOperations};
use crate::device::{DiscoveryResult, Discoverer};
use crate::runner::CommandLine;
use chrono::{DateTime, Local};
use std::fmt::Write as _;

pub const PERMISSION_REMEDY: &str = "sudo usermod -a -G tape $USER";

/// Snapshot of LTFS tooling, drives and mounts on this host
#[derive(Debug, Clone)]
pub struct SystemStatus {
    pub collected_at: DateTime<Local>,
    /// `ltfs --version` output, `None` when ltfs is not installed
    pub ltfs_version: Option<String>,
    pub discovery: DiscoveryResult,
    pub mounts: Vec<LtfsMount>,
    pub mounts_error: Option<String>,
    pub kernel: Option<String>,
}

impl SystemStatus {
    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "=== LTFS System Status ===");
        let _ = writeln!(
            text,
            "Collected: {}",
            self.collected_at.format("%Y-%m-%d %H:%M:%S")
        );

        let _ = writeln!(text, "\nLTFS Version:");
        match &self.ltfs_version {
            Some(version) => {
                let _ = writeln!(text, "{}", version.trim_end());
            }
            None => {
                let _ = writeln!(text, "LTFS not found or not working");
            }
        }

        let _ = writeln!(text, "\nTape Devices:");
        if self.discovery.is_empty() {
            let _ = writeln!(text, "No tape devices detected");
        }
        for path in &self.discovery.ordered_devices {
            let _ = writeln!(text, "{}", path.display());
        }
        if !self.discovery.permission_issues.is_empty() {
            let _ = writeln!(text, "Permission denied:");
            for path in &self.discovery.permission_issues {
                let _ = writeln!(text, "  {}", path.display());
            }
            let _ = writeln!(
                text,
                "Fix with `{}`, then log out and back in",
                PERMISSION_REMEDY
            );
        }

        let _ = writeln!(text, "\nMounted LTFS Filesystems:");
        match (&self.mounts_error, self.mounts.is_empty()) {
            (Some(err), _) => {
                let _ = writeln!(text, "Error checking mounts: {}", err);
            }
            (None, true) => {
                let _ = writeln!(text, "No LTFS filesystems mounted");
            }
            (None, false) => {
                for mount in &self.mounts {
                    let _ = writeln!(
                        text,
                        "{} on {} type {}",
                        mount.source,
                        mount.mount_point.display(),
                        mount.fstype
                    );
                }
            }
        }

        let _ = writeln!(text, "\nSystem Information:");
        let _ = writeln!(
            text,
            "{}",
            self.kernel.as_deref().unwrap_or("unavailable").trim_end()
        );
        text
    }
}

impl TapeOperations {
    /// Each part is collected independently; one failing does not hide the others.
    pub async fn system_status(&self, discoverer: &Discoverer) -> SystemStatus {
        let ltfs = self
            .runner
            .run(&CommandLine::new("ltfs").arg("--version"))
            .await;
        // ltfs prints its banner on stderr
        let ltfs_version = ltfs.succeeded.then(|| {
            if ltfs.stdout.trim().is_empty() {
                ltfs.stderr.clone()
            } else {
                ltfs.stdout.clone()
            }
        });

        let discovery = discoverer.discover().await;

        let (mounts, mounts_error) = match self.list_ltfs_mounts().await {
            Ok(mounts) => (mounts, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        let uname = self.runner.run(&CommandLine::new("uname").arg("-a")).await;
        let kernel = uname.succeeded.then(|| uname.stdout.clone());

        SystemStatus {
            collected_at: Local::now(),
            ltfs_version,
            discovery,
            mounts,
            mounts_error,
            kernel,
        }
    }
}
