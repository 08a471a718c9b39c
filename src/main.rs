use clap::Parser;
use std::process::ExitCode;

use atmosenv::cli::Cli;
use atmosenv::{commands, ui};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so shim and `init -` output stay clean
    let default_filter = if cli.verbose { "atmosenv=debug" } else { "atmosenv=warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("ATMOSENV_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match commands::execute(cli) {
        Ok(code) => code,
        Err(err) => {
            ui::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
