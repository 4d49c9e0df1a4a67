//! MAM Command Handler

use super::{run_in_background, Context};
use crate::cli::{DeviceArgs, MamCommand};
use crate::display;
use crate::error::Result;
use crate::tape_ops::MamWrite;

pub async fn execute(ctx: &Context, target: &DeviceArgs, action: MamCommand) -> Result<()> {
    let device = ctx.resolve_device(target).await?;

    match action {
        MamCommand::Summary => {
            println!("{}", ctx.ops.mam_summary(&device).await?.trim_end());
        }
        MamCommand::Read { id, partition } => {
            let attributes = ctx.ops.read_mam(&device, id, partition).await?;
            display::display_mam_attributes(&attributes);
        }
        MamCommand::Write {
            id,
            value,
            partition,
        } => {
            let write = MamWrite {
                id,
                value,
                partition,
            };
            // Reject bad values before touching the drive
            write.encode()?;

            let ops = ctx.ops.clone();
            let worker_device = device.clone();
            run_in_background("Writing MAM attribute", async move {
                ops.write_mam(&worker_device, &write).await
            })
            .await??;
            println!("✅ Attribute 0x{:04X} written on {}", id, device.display());
        }
    }
    Ok(())
}
