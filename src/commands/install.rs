use super::Context;
use crate::error::Error;
use crate::{ui, InstallOptions, Installer, VersionSpec};
use anyhow::Result;

pub fn execute(ctx: &Context, version: Option<String>, activate: bool) -> Result<()> {
    let spec = match version {
        Some(raw) => VersionSpec::parse(&raw)?,
        None => match ctx.resolver().resolve(&ctx.cwd) {
            Ok(resolution) => resolution.spec,
            Err(Error::Unresolved) => VersionSpec::Latest,
            Err(err) => return Err(err.into()),
        },
    };

    let catalog = ctx.catalog()?;
    let installer = Installer::new(&ctx.store, &catalog);
    let progress = ui::Progress::new("Installing", format!("atmos {spec}"));

    let outcome = match installer.install(&spec, InstallOptions { activate }) {
        Ok(outcome) => outcome,
        Err(err) => {
            progress.fail("Failed", &err);
            return Err(err.into());
        }
    };

    let version = outcome.installed.version;
    if outcome.already_present {
        progress.success("Installed", Some(format!("(already present as {version})")));
    } else {
        progress.success("Installed", Some(format!("as {version}")));
    }

    if outcome.activated {
        ui::success("Using", format!("atmos {version} globally"));
    }
    Ok(())
}
