//! Drive Control Command Handlers
//!
//! Handles `info`, `mt` and `eject`.

use super::{ensure_drive_success, Context};
use crate::cli::DeviceArgs;
use crate::display;
use crate::error::Result;
use crate::tape_ops::MtOperation;
use tracing::info;

pub async fn info(ctx: &Context, target: &DeviceArgs) -> Result<()> {
    let device = ctx.resolve_device(target).await?;
    println!("📊 Device information for {}:", device.display());
    println!("{}", ctx.ops.tape_info(&device).await.trim_end());
    Ok(())
}

pub async fn mt(ctx: &Context, target: &DeviceArgs, operation: MtOperation) -> Result<()> {
    if operation == MtOperation::Eject {
        return eject(ctx, target).await;
    }

    let device = ctx.resolve_device(target).await?;
    let output = ctx.ops.mt(&device, operation).await;

    if output.succeeded {
        println!("✅ {} completed on {}", operation, device.display());
        if !output.stdout.trim().is_empty() {
            println!("{}", output.stdout.trim_end());
        }
    } else {
        println!("❌ {} failed: {}", operation, output.error_message());
    }
    ensure_drive_success(&operation.command(&device).to_string(), &device, &output)
}

pub async fn eject(ctx: &Context, target: &DeviceArgs) -> Result<()> {
    let device = ctx.resolve_device(target).await?;
    info!("Ejecting {}", device.display());

    let attempts = ctx.ops.eject(&device).await;
    display::display_attempts("Eject", &attempts);
    ensure_drive_success("eject", &device, &attempts.output)
}
