use super::Context;
use crate::{ui, VersionSource, VersionSpec};
use anyhow::Result;

pub fn execute(ctx: &Context, version: &str) -> Result<()> {
    let spec = VersionSpec::parse(version)?;
    let version = ctx.shims().activate_spec(&spec)?;
    ui::success("Using", format!("atmos {version} globally"));

    // The global pointer is the lowest precedence source.
    if let Ok(resolution) = ctx.resolver().resolve(&ctx.cwd) {
        if !matches!(resolution.source, VersionSource::GlobalPointer(_)) {
            ui::warn(format!(
                "This directory still uses {} ({})",
                resolution.spec, resolution.source
            ));
        }
    }
    Ok(())
}
