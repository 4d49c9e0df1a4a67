//! LTFS mount / unmount
//!
//! Mounting tries a fixed list of ltfs option sets until one works, since
//! some drive families need `force_mount_no_eod` or `sync_type=unmount` and
//! others refuse them. Unmounting tries `umount` and then `fusermount -u`.

use super::{device_arg, MtOperation, TapeOperations};
use crate::error::{LtfsAdminError, Result};
use crate::runner::{run_until_success, Attempts, CommandLine, CommandOutput};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extra ltfs `-o` options, tried in this order
pub const MOUNT_OPTION_SETS: &[&[&str]] = &[
    &[],
    &["force_mount_no_eod"],
    &["sync_type=unmount"],
    &["force_mount_no_eod", "sync_type=unmount"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    pub device: PathBuf,
    pub mount_point: PathBuf,
    /// User options appended after the built-in option set
    pub options: Vec<String>,
}

impl MountRequest {
    pub fn command_variants(&self) -> Vec<CommandLine> {
        MOUNT_OPTION_SETS
            .iter()
            .map(|set| {
                let mut opts = vec![format!("devname={}", device_arg(&self.device))];
                opts.extend(set.iter().map(|s| s.to_string()));
                opts.extend(
                    self.options
                        .iter()
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .map(String::from),
                );
                CommandLine::new("ltfs")
                    .arg("-o")
                    .arg(opts.join(","))
                    .arg(device_arg(&self.mount_point))
            })
            .collect()
    }
}

pub fn unmount_commands(mount_point: &Path) -> Vec<CommandLine> {
    vec![
        CommandLine::new("umount").arg(device_arg(mount_point)),
        CommandLine::new("fusermount")
            .arg("-u")
            .arg(device_arg(mount_point)),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountRecord {
    pub device: PathBuf,
    pub options: Vec<String>,
    pub mounted_at: DateTime<Local>,
}

/// Mounts made by this process. Advisory only: the OS mount table is the
/// source of truth.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    entries: BTreeMap<PathBuf, MountRecord>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mount_point: PathBuf, record: MountRecord) {
        self.entries.insert(mount_point, record);
    }

    pub fn remove(&mut self, mount_point: &Path) -> Option<MountRecord> {
        self.entries.remove(mount_point)
    }

    pub fn get(&self, mount_point: &Path) -> Option<&MountRecord> {
        self.entries.get(mount_point)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One active LTFS mount as reported by `mount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LtfsMount {
    pub source: String,
    pub mount_point: PathBuf,
    pub fstype: String,
    pub options: Vec<String>,
}

/// Keep lines mentioning ltfs from `mount` output and split them into
/// `<source> on <mount point> type <fstype> (<options>)`.
pub fn parse_mount_output(text: &str) -> Vec<LtfsMount> {
    text.lines()
        .filter(|line| line.contains("ltfs"))
        .filter_map(|line| {
            let (source, rest) = line.split_once(" on ")?;
            let type_at = rest.rfind(" type ")?;
            let mount_point = &rest[..type_at];
            let mut tail = rest[type_at + " type ".len()..].splitn(2, ' ');
            let fstype = tail.next()?.to_string();
            let options = tail
                .next()
                .map(|o| o.trim().trim_start_matches('(').trim_end_matches(')'))
                .map(|o| o.split(',').map(String::from).collect())
                .unwrap_or_default();

            Some(LtfsMount {
                source: source.trim().to_string(),
                mount_point: PathBuf::from(mount_point),
                fstype,
                options,
            })
        })
        .collect()
}

impl TapeOperations {
    pub async fn mount(&self, table: &mut MountTable, request: &MountRequest) -> Attempts {
        info!(
            "Mounting {} at {}",
            request.device.display(),
            request.mount_point.display()
        );

        if let Err(e) = tokio::fs::create_dir_all(&request.mount_point).await {
            warn!(
                "Cannot create mount point {}: {}",
                request.mount_point.display(),
                e
            );
            return Attempts {
                attempted: Vec::new(),
                output: CommandOutput::failure(format!(
                    "cannot create mount point {}: {}",
                    request.mount_point.display(),
                    e
                )),
            };
        }

        if self.config.mount.rewind_before_mount {
            let rewind = self.mt(&request.device, MtOperation::Rewind).await;
            if !rewind.succeeded {
                warn!(
                    "Could not rewind {}: {}",
                    request.device.display(),
                    rewind.error_message()
                );
            }
        }

        let attempts = run_until_success(self.runner.as_ref(), request.command_variants()).await;

        if attempts.succeeded() {
            info!(
                "Mounted {} after {} attempt(s)",
                request.device.display(),
                attempts.attempted.len()
            );
            table.record(
                request.mount_point.clone(),
                MountRecord {
                    device: request.device.clone(),
                    options: request.options.clone(),
                    mounted_at: Local::now(),
                },
            );
        }
        attempts
    }

    pub async fn unmount(&self, table: &mut MountTable, mount_point: &Path) -> Attempts {
        info!("Unmounting {}", mount_point.display());
        let attempts = run_until_success(self.runner.as_ref(), unmount_commands(mount_point)).await;
        if attempts.succeeded() {
            if let Some(record) = table.remove(mount_point) {
                debug!("Released {} from mount table", record.device.display());
            }
        }
        attempts
    }

    /// Active LTFS mounts from the OS, never from the in-memory table
    pub async fn list_ltfs_mounts(&self) -> Result<Vec<LtfsMount>> {
        let command = CommandLine::new("mount");
        let output = self.runner.run(&command).await;
        if !output.succeeded {
            return Err(LtfsAdminError::command_failed(
                command.to_string(),
                output.stderr,
            ));
        }
        Ok(parse_mount_output(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::scripted::ScriptedRunner;
    use crate::tape_ops::test_operations;
    use std::sync::Arc;

    fn request(mount_point: &Path) -> MountRequest {
        MountRequest {
            device: PathBuf::from("/dev/nst0"),
            mount_point: mount_point.to_path_buf(),
            options: Vec::new(),
        }
    }

    #[test]
    fn test_command_variants_order() {
        let req = MountRequest {
            device: PathBuf::from("/dev/nst0"),
            mount_point: PathBuf::from("/mnt/ltfs"),
            options: vec!["allow_other".into(), " ".into()],
        };
        let rendered: Vec<String> = req
            .command_variants()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "ltfs -o devname=/dev/nst0,allow_other /mnt/ltfs",
                "ltfs -o devname=/dev/nst0,force_mount_no_eod,allow_other /mnt/ltfs",
                "ltfs -o devname=/dev/nst0,sync_type=unmount,allow_other /mnt/ltfs",
                "ltfs -o devname=/dev/nst0,force_mount_no_eod,sync_type=unmount,allow_other /mnt/ltfs",
            ]
        );
    }

    #[tokio::test]
    async fn test_mount_tries_every_variant_until_last_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let mp = dir.path().join("ltfs");
        let req = request(&mp);
        let variants = req.command_variants();
        let last = variants.last().unwrap().to_string();

        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("mt -f /dev/nst0 rewind", CommandOutput::success(""))
                .respond(&last, CommandOutput::success("mounted"))
                .respond("ltfs", CommandOutput::failure("mount failed")),
        );
        let ops = test_operations(runner.clone());
        let mut table = MountTable::new();

        let attempts = ops.mount(&mut table, &req).await;

        assert!(attempts.succeeded());
        assert_eq!(attempts.output.stdout, "mounted");
        assert_eq!(attempts.attempted, variants);
        assert!(mp.is_dir());

        let history = runner.history();
        assert_eq!(history[0], "mt -f /dev/nst0 rewind");
        assert_eq!(history.len(), 1 + MOUNT_OPTION_SETS.len());
        assert_eq!(
            table.get(&mp).map(|r| r.device.clone()),
            Some(PathBuf::from("/dev/nst0"))
        );
    }

    #[tokio::test]
    async fn test_mount_stops_at_first_success() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ops = test_operations(runner.clone());
        let mut table = MountTable::new();

        let attempts = ops.mount(&mut table, &request(dir.path())).await;
        assert!(attempts.succeeded());
        assert_eq!(attempts.attempted.len(), 1);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_mount_failure_leaves_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("ltfs", CommandOutput::failure("No medium found"))
                .fallback(CommandOutput::failure("rewind failed")),
        );
        let ops = test_operations(runner);
        let mut table = MountTable::new();

        let attempts = ops.mount(&mut table, &request(dir.path())).await;
        assert!(!attempts.succeeded());
        assert_eq!(attempts.attempted.len(), MOUNT_OPTION_SETS.len());
        assert_eq!(attempts.output.stderr, "No medium found");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_unmount_falls_back_to_fusermount() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("umount", CommandOutput::failure("umount: only root can do that"))
                .respond("fusermount -u /mnt/ltfs", CommandOutput::success("released")),
        );
        let ops = test_operations(runner.clone());
        let mut table = MountTable::new();
        table.record(
            PathBuf::from("/mnt/ltfs"),
            MountRecord {
                device: PathBuf::from("/dev/nst0"),
                options: Vec::new(),
                mounted_at: Local::now(),
            },
        );

        let attempts = ops.unmount(&mut table, Path::new("/mnt/ltfs")).await;
        assert!(attempts.succeeded());
        assert_eq!(attempts.output.stdout, "released");
        assert_eq!(
            runner.history(),
            vec!["umount /mnt/ltfs", "fusermount -u /mnt/ltfs"]
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_mount_output() {
        let text = "\
/dev/sda1 on / type ext4 (rw,relatime)
ltfs:/dev/nst0 on /mnt/ltfs type fuse (rw,nosuid,nodev,relatime,user_id=0,group_id=0)
ltfs on /media/my tape type fuse.ltfs (rw)
";
        let mounts = parse_mount_output(text);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].source, "ltfs:/dev/nst0");
        assert_eq!(mounts[0].mount_point, PathBuf::from("/mnt/ltfs"));
        assert_eq!(mounts[0].fstype, "fuse");
        assert_eq!(mounts[0].options[0], "rw");
        assert_eq!(mounts[1].mount_point, PathBuf::from("/media/my tape"));
        assert_eq!(mounts[1].fstype, "fuse.ltfs");
    }

    #[tokio::test]
    async fn test_list_mounts_command_failure() {
        let runner = Arc::new(ScriptedRunner::new().fallback(CommandOutput::failure("boom")));
        let ops = test_operations(runner);
        let err = ops.list_ltfs_mounts().await.unwrap_err();
        assert!(matches!(err, LtfsAdminError::CommandFailed { .. }));
    }
}
