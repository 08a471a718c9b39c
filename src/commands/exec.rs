use super::Context;
use anyhow::Result;
use std::ffi::OsString;
use std::process::ExitCode;

pub fn execute(ctx: &Context, args: &[OsString]) -> Result<ExitCode> {
    let code = ctx.shims().dispatch(args, &ctx.cwd)?;
    // Exit statuses outside 0..=255 only occur on Windows.
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
