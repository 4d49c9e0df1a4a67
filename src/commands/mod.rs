//! Command Handlers Module
//!
//! This module contains handlers for all CLI subcommands.

pub mod diag;
pub mod drive;
pub mod format;
pub mod list;
pub mod mam;
pub mod mount;
pub mod status;

use crate::cli::DeviceArgs;
use crate::config::Config;
use crate::device::{select_device, Discoverer};
use crate::display;
use crate::error::{LtfsAdminError, Result};
use crate::runner::{CommandOutput, CommandRunner, SystemRunner};
use crate::tape_ops::TapeOperations;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Shared handles for one CLI invocation
pub struct Context {
    pub ops: TapeOperations,
    pub discoverer: Discoverer,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let discoverer = Discoverer::new(&config, Arc::clone(&runner));
        Self {
            ops: TapeOperations::new(runner, config),
            discoverer,
        }
    }

    pub fn config(&self) -> &Config {
        self.ops.config()
    }

    /// An explicit `--device` wins; otherwise scan and apply the selection policy.
    pub async fn resolve_device(&self, target: &DeviceArgs) -> Result<PathBuf> {
        if let Some(device) = &target.device {
            debug!("Using explicit device {}", device.display());
            return Ok(device.clone());
        }

        let discovery = self.discoverer.discover().await;
        display::display_permission_warning(&discovery);
        let device = select_device(
            &discovery,
            target.drive,
            target.rewind_preference(),
            target.mode.as_deref(),
        )?;
        if discovery.permission_issues.contains(&device) {
            return Err(LtfsAdminError::PermissionDenied(device));
        }
        Ok(device)
    }
}

/// Run `task` on its own tokio worker while the terminal shows a spinner.
pub async fn run_in_background<F, T>(message: &str, task: F) -> Result<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));

    let joined = tokio::spawn(task).await;
    spinner.finish_and_clear();

    joined.map_err(|e| {
        error!("Worker for '{}' did not complete: {}", message, e);
        LtfsAdminError::Generic(anyhow::anyhow!("worker task failed: {}", e))
    })
}

/// Turn an unsuccessful external command into the process-level failure
pub(crate) fn ensure_success(action: &str, succeeded: bool, reason: &str) -> Result<()> {
    if succeeded {
        Ok(())
    } else {
        Err(LtfsAdminError::command_failed(action, reason))
    }
}

/// Like [`ensure_success`] for commands aimed at one drive; EBUSY becomes
/// `DeviceBusy` so the caller can tell a held drive from a broken one.
pub(crate) fn ensure_drive_success(
    action: &str,
    device: &Path,
    output: &CommandOutput,
) -> Result<()> {
    if output.reports_busy() {
        return Err(LtfsAdminError::DeviceBusy(device.to_path_buf()));
    }
    ensure_success(action, output.succeeded, output.error_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::scripted::ScriptedRunner;

    #[tokio::test]
    async fn test_explicit_device_skips_discovery() {
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = Context::with_runner(Config::default(), runner.clone());
        let target = DeviceArgs {
            device: Some(PathBuf::from("/dev/nst3")),
            ..Default::default()
        };
        assert_eq!(
            ctx.resolve_device(&target).await.unwrap(),
            PathBuf::from("/dev/nst3")
        );
        assert!(runner.history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_device_dir_has_no_device() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            device_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let ctx = Context::with_runner(config, Arc::new(ScriptedRunner::new()));
        let err = ctx.resolve_device(&DeviceArgs::default()).await.unwrap_err();
        assert!(matches!(err, LtfsAdminError::NoDeviceAvailable(_)));
    }

    #[tokio::test]
    async fn test_selected_node_without_permission_is_rejected() {
        use crate::config::DiscoveryConfig;
        use crate::device::discovery::fixtures::{MapProbe, MemorySource};

        let runner: Arc<dyn CommandRunner> = Arc::new(ScriptedRunner::new());
        let discoverer = Discoverer::with_parts(
            Box::new(MemorySource::char_devices(&["st0", "nst0"])),
            Box::new(MapProbe::default().deny("/dev/st0")),
            Arc::clone(&runner),
            DiscoveryConfig::default(),
        );
        let ctx = Context {
            ops: TapeOperations::new(runner, Config::default()),
            discoverer,
        };

        let err = ctx.resolve_device(&DeviceArgs::default()).await.unwrap_err();
        assert!(matches!(
            err,
            LtfsAdminError::PermissionDenied(p) if p == PathBuf::from("/dev/st0")
        ));

        let target = DeviceArgs {
            non_rewinding: true,
            ..Default::default()
        };
        assert_eq!(
            ctx.resolve_device(&target).await.unwrap(),
            PathBuf::from("/dev/nst0")
        );
    }

    #[test]
    fn test_busy_drive_maps_to_device_busy() {
        let device = Path::new("/dev/nst0");
        let busy = CommandOutput::failure("/dev/nst0: Device or resource busy");
        assert!(matches!(
            ensure_drive_success("mt status", device, &busy),
            Err(LtfsAdminError::DeviceBusy(p)) if p == PathBuf::from("/dev/nst0")
        ));

        let failed = CommandOutput::failure("/dev/nst0: Input/output error");
        assert!(matches!(
            ensure_drive_success("mt status", device, &failed),
            Err(LtfsAdminError::CommandFailed { .. })
        ));
        assert!(ensure_drive_success("mt status", device, &CommandOutput::success("")).is_ok());
    }

    #[tokio::test]
    async fn test_background_task_returns_value() {
        let value = run_in_background("adding", async { 2 + 2 }).await.unwrap();
        assert_eq!(value, 4);
    }
}
