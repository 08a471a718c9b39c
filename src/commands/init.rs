use super::Context;
use crate::paths::install_prefix;
use crate::shell::{emit, InitOptions, Shell};
use anyhow::{bail, Context as _, Result};
use std::env;
use std::path::PathBuf;

pub fn execute(ctx: &Context, print: Option<&str>, shell: Option<&str>, no_hook: bool) -> Result<()> {
    let shell = match shell {
        Some(name) => Shell::from_name(name)?,
        None => Shell::detect()?,
    };

    match print {
        Some("-") => {}
        Some(other) => bail!("Unexpected argument '{other}'; use 'atmosenv init -' to print the init script"),
        None => {
            println!("# Load atmosenv automatically by appending the following to {}:", shell.rc_file());
            println!();
            println!("{}", shell.eval_line());
            return Ok(());
        }
    }

    let shims = ctx.shims();
    shims.ensure_shim().context("Failed to write the atmos shim")?;

    let options = InitOptions {
        shim_dir: shims.shim_dir(),
        exe: atmosenv_exe()?,
        hook: !no_hook && ctx.config()?.shell_hook,
    };
    print!("{}", emit(shell, &options));
    Ok(())
}

/// `$ATMOSENV_ROOT/bin/atmosenv` when a wrapper install provides it, else this binary.
fn atmosenv_exe() -> Result<PathBuf> {
    if let Some(candidate) = install_prefix().map(|root| root.join("bin").join("atmosenv")) {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    env::current_exe().context("Failed to locate the atmosenv executable")
}
