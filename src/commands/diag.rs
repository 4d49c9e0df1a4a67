//! Diagnostics Command Handler

use super::{ensure_success, run_in_background, Context};
use crate::cli::DeviceArgs;
use crate::display;
use crate::error::Result;
use crate::tape_ops::diagnostics::save_reports;
use crate::tape_ops::SuiteKind;
use std::path::PathBuf;

pub async fn execute(
    ctx: &Context,
    target: &DeviceArgs,
    suite: SuiteKind,
    allow_write: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let device = ctx.resolve_device(target).await?;

    let ops = ctx.ops.clone();
    let worker_device = device.clone();
    let reports = run_in_background("Running diagnostics", async move {
        ops.run_diagnostics(suite, &worker_device, allow_write).await
    })
    .await??;

    display::display_suite_reports(&reports);
    // aborted runs are saved too
    if let Some(path) = output {
        save_reports(&path, &reports)?;
        println!("💾 Diagnostics saved to {}", path.display());
    }

    let aborted = reports.iter().filter(|r| !r.completed).count();
    ensure_success(
        "diagnostics",
        aborted == 0,
        &format!("{} suite(s) aborted on {}", aborted, device.display()),
    )
}
