use super::Context;
use anyhow::Result;

pub fn execute(ctx: &Context) -> Result<()> {
    let installed = ctx.resolver().resolve_installed(&ctx.cwd, &ctx.store)?;
    println!("{}", installed.version);
    Ok(())
}
