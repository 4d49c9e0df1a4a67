//! Status Command Handler

use super::Context;
use crate::error::Result;

pub async fn execute(ctx: &Context) -> Result<()> {
    let status = ctx.ops.system_status(&ctx.discoverer).await;
    print!("{}", status.render());
    Ok(())
}
