//! List / Select Command Handlers

use super::Context;
use crate::cli::DeviceArgs;
use crate::display;
use crate::error::Result;
use tracing::info;

pub async fn execute(ctx: &Context, detailed: bool, json: bool) -> Result<()> {
    let discovery = ctx.discoverer.discover().await;

    if json {
        display::display_discovery_json(&discovery)?;
        display::display_permission_warning(&discovery);
    } else {
        display::display_device_list(&discovery, detailed);
    }
    Ok(())
}

pub async fn select(ctx: &Context, target: &DeviceArgs) -> Result<()> {
    let device = ctx.resolve_device(target).await?;
    info!("Selected device {}", device.display());
    println!("{}", device.display());
    Ok(())
}
