//! Mount Command Handlers
//!
//! Handles `mount`, `unmount` and `mounts`.
//!
//! The [`MountTable`] lives as long as the process, and each CLI invocation is
//! its own process. `mount` uses it only to report the record it just made.
//! `unmount` therefore starts from an empty table and relies on the OS: the
//! umount chain runs whether or not the mount point was ever recorded.

use super::{ensure_success, run_in_background, Context};
use crate::cli::DeviceArgs;
use crate::display;
use crate::error::Result;
use crate::tape_ops::{MountRequest, MountTable};
use std::path::PathBuf;
use tracing::info;

pub async fn mount(
    ctx: &Context,
    target: &DeviceArgs,
    mount_point: Option<PathBuf>,
    options: Vec<String>,
) -> Result<()> {
    let device = ctx.resolve_device(target).await?;
    let mount_point = mount_point.unwrap_or_else(|| ctx.config().mount.default_mount_point.clone());

    let mut all_options = ctx.config().mount.options.clone();
    all_options.extend(options);
    let request = MountRequest {
        device,
        mount_point,
        options: all_options,
    };

    println!(
        "🔧 Mounting {} at {}",
        request.device.display(),
        request.mount_point.display()
    );

    let ops = ctx.ops.clone();
    let worker_request = request.clone();
    let (table, attempts) = run_in_background("Mounting LTFS volume", async move {
        let mut table = MountTable::new();
        let attempts = ops.mount(&mut table, &worker_request).await;
        (table, attempts)
    })
    .await?;

    display::display_attempts("Mount", &attempts);
    if let Some(record) = table.get(&request.mount_point) {
        display::display_mount_record(&request.mount_point, record);
    }
    ensure_success("ltfs mount", attempts.succeeded(), attempts.output.error_message())
}

pub async fn unmount(ctx: &Context, mount_point: PathBuf) -> Result<()> {
    info!("Unmount requested for {}", mount_point.display());

    let ops = ctx.ops.clone();
    let worker_mount_point = mount_point.clone();
    let attempts = run_in_background("Unmounting LTFS volume", async move {
        // nothing recorded in this process; see module docs
        let mut table = MountTable::new();
        ops.unmount(&mut table, &worker_mount_point).await
    })
    .await?;

    display::display_attempts("Unmount", &attempts);
    ensure_success("unmount", attempts.succeeded(), attempts.output.error_message())
}

pub async fn list_mounts(ctx: &Context) -> Result<()> {
    let mounts = ctx.ops.list_ltfs_mounts().await?;
    display::display_mounts(&mounts);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::runner::scripted::ScriptedRunner;
    use crate::runner::CommandOutput;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unmount_without_recorded_mount_still_runs_chain() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("umount", CommandOutput::failure("umount: must be superuser")),
        );
        let ctx = Context::with_runner(Config::default(), runner.clone());

        unmount(&ctx, PathBuf::from("/mnt/ltfs")).await.unwrap();
        assert_eq!(
            runner.history(),
            vec!["umount /mnt/ltfs", "fusermount -u /mnt/ltfs"]
        );
    }

    #[tokio::test]
    async fn test_unmount_failure_is_reported() {
        let runner =
            Arc::new(ScriptedRunner::new().fallback(CommandOutput::failure("not mounted")));
        let ctx = Context::with_runner(Config::default(), runner);

        let err = unmount(&ctx, PathBuf::from("/mnt/ltfs")).await.unwrap_err();
        assert!(matches!(err, crate::error::LtfsAdminError::CommandFailed { .. }));
    }
}
