use crate::catalog::{GithubClient, RemoteCatalog};
use crate::cli::{Cli, Commands};
use crate::paths::logical_cwd;
use crate::{Config, ConfigRoot, ShimManager, VersionResolver, VersionStore};
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::process::ExitCode;

mod exec;
mod init;
mod install;
mod list;
mod list_remote;
mod uninstall;
mod use_version;
mod version_name;
mod which;

/// Everything a command needs, located once from the environment.
pub struct Context {
    pub root: ConfigRoot,
    pub store: VersionStore,
    pub cwd: PathBuf,
}

impl Context {
    pub fn from_env() -> Result<Self> {
        let root = ConfigRoot::from_env().context("Failed to locate the atmosenv config root")?;
        let cwd = logical_cwd().context("Failed to read the current directory")?;
        Ok(Self {
            store: VersionStore::new(root.clone()),
            root,
            cwd,
        })
    }

    pub fn config(&self) -> Result<Config> {
        Ok(Config::load(&self.root)?)
    }

    pub fn resolver(&self) -> VersionResolver {
        VersionResolver::from_env(&self.root)
    }

    pub fn shims(&self) -> ShimManager {
        ShimManager::with_resolver(self.store.clone(), self.resolver())
    }

    pub fn catalog(&self) -> Result<RemoteCatalog<GithubClient>> {
        let config = self.config()?;
        let client = GithubClient::from_config(&config)?;
        Ok(RemoteCatalog::new(client))
    }
}

pub fn execute(cli: Cli) -> Result<ExitCode> {
    let ctx = Context::from_env()?;

    match cli.command {
        Commands::Install { version, activate } => install::execute(&ctx, version, activate)?,

        Commands::Uninstall { version } => uninstall::execute(&ctx, &version)?,

        Commands::Use { version } => use_version::execute(&ctx, &version)?,

        Commands::List => list::execute(&ctx)?,

        Commands::ListRemote { limit } => list_remote::execute(&ctx, limit)?,

        Commands::VersionName => version_name::execute(&ctx)?,

        Commands::Which => which::execute(&ctx)?,

        Commands::Init {
            print,
            shell,
            no_hook,
        } => init::execute(&ctx, print.as_deref(), shell.as_deref(), no_hook)?,

        Commands::Exec { args } => return exec::execute(&ctx, &args),
    }

    Ok(ExitCode::SUCCESS)
}
