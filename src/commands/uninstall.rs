use super::Context;
use crate::{ui, Version, VersionSpec};
use anyhow::{Context as _, Result};

pub fn execute(ctx: &Context, version: &str) -> Result<()> {
    let version = Version::parse(version)?;
    ctx.store
        .remove(&version)
        .with_context(|| format!("Failed to uninstall atmos {version}"))?;
    ui::success("Uninstalled", format!("atmos {version}"));

    if let Ok(resolution) = ctx.resolver().resolve(&ctx.cwd) {
        if resolution.spec == VersionSpec::Exact(version) {
            ui::warn(format!(
                "atmos {version} is still selected ({}); pick another with 'atmosenv use'",
                resolution.source
            ));
        }
    }
    Ok(())
}
