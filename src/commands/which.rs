use super::Context;
use anyhow::Result;

pub fn execute(ctx: &Context) -> Result<()> {
    let installed = ctx.shims().current(&ctx.cwd)?;
    println!("{}", installed.binary().display());
    Ok(())
}
