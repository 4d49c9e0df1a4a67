//! Format Command Handler
//!
//! Handles the `format` subcommand: mkltfs after an explicit confirmation.

use super::{ensure_success, run_in_background, Context};
use crate::cli::DeviceArgs;
use crate::error::Result;
use crate::tape_ops::FormatRequest;
use crate::utils;
use std::io;
use tracing::{info, warn};

pub async fn execute(
    ctx: &Context,
    target: &DeviceArgs,
    label: Option<String>,
    force: bool,
    block_size: Option<u32>,
    yes: bool,
) -> Result<()> {
    let device = ctx.resolve_device(target).await?;
    let request = FormatRequest {
        device,
        label,
        force,
        block_size,
    };
    request.validate()?;

    println!("\n⚠️  Formatting will ERASE ALL DATA on the tape!");
    println!("  Device: {}", request.device.display());
    if let Some(label) = &request.label {
        println!("  Label: {}", label);
    }

    if !yes {
        let stdin = io::stdin();
        let confirmed = utils::confirm(
            "Are you sure you want to continue?",
            &mut stdin.lock(),
            &mut io::stdout(),
        )?;
        if !confirmed {
            warn!("Format of {} cancelled by user", request.device.display());
            println!("Format cancelled");
            return Ok(());
        }
    }

    info!("Starting format of {}", request.device.display());
    let ops = ctx.ops.clone();
    let worker_request = request.clone();
    let output = run_in_background("Formatting tape with LTFS", async move {
        ops.format(&worker_request).await
    })
    .await??;

    if output.succeeded {
        println!("✅ Tape formatted successfully");
        if !output.stdout.trim().is_empty() {
            println!("{}", output.stdout.trim_end());
        }
    } else {
        println!("❌ Format failed: {}", output.error_message());
    }
    ensure_success("mkltfs", output.succeeded, output.error_message())
}
