//! Unlock command implementation

use anyhow::{Context, Result};
use dbm_migrate::force_unlock;

use crate::cli::GlobalArgs;
use crate::context::RuntimeContext;

/// Execute the unlock command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let removed = force_unlock(&ctx.db, &ctx.schema).context("Failed to remove migration lock")?;

    if removed {
        println!("Removed migration lock on schema '{}'", ctx.schema);
    } else {
        println!("Schema '{}' was not locked", ctx.schema);
    }
    Ok(())
}
