use super::Context;
use anyhow::{Context as _, Result};

pub fn execute(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let catalog = ctx.catalog()?;
    let versions = catalog
        .list_remote(limit)
        .context("Failed to list upstream releases")?;

    for version in versions {
        println!("{version}");
    }
    Ok(())
}
