use super::Context;
use anyhow::Result;

pub fn execute(ctx: &Context) -> Result<()> {
    let versions = ctx.store.list()?;
    if versions.is_empty() {
        println!("No versions installed. Run 'atmosenv install' to install the latest release.");
        return Ok(());
    }

    let resolver = ctx.resolver();
    let current = resolver.resolve_installed(&ctx.cwd, &ctx.store).ok();
    let source = resolver.resolve(&ctx.cwd).ok().map(|resolution| resolution.source);

    for version in versions.iter().rev() {
        match (&current, &source) {
            (Some(installed), Some(source)) if installed.version == *version => {
                println!("* {version} ({source})");
            }
            _ => println!("  {version}"),
        }
    }
    Ok(())
}
