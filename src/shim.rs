//! The `atmos` shim and the global pointer it falls back to.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::installer::archive::make_executable;
use crate::paths::{RootPath, TOOL_BINARY};
use crate::resolver::VersionResolver;
use crate::shell::sh_quote;
use crate::store::{InstalledVersion, VersionStore};
use crate::version::{Version, VersionSpec};

/// Shim name inside `shims/`; always a POSIX script.
pub const SHIM_NAME: &str = "atmos";

pub struct ShimManager {
    store: VersionStore,
    resolver: VersionResolver,
}

impl ShimManager {
    /// Manager that honours `ATMOSENV_ATMOS_VERSION`.
    pub fn new(store: VersionStore) -> Self {
        let resolver = VersionResolver::from_env(store.root());
        Self::with_resolver(store, resolver)
    }

    pub fn with_resolver(store: VersionStore, resolver: VersionResolver) -> Self {
        Self { store, resolver }
    }

    pub fn shim_dir(&self) -> PathBuf {
        self.store.root().path(RootPath::Shims)
    }

    pub fn shim_path(&self) -> PathBuf {
        self.shim_dir().join(SHIM_NAME)
    }

    /// Point the global selection at an installed version.
    ///
    /// The pointer is replaced atomically; on error it is left untouched.
    pub fn activate(&self, version: &Version) -> Result<()> {
        self.store.get(version)?;

        let pointer = self.store.root().path(RootPath::VersionPointer);
        let dir = self.store.root().path(RootPath::Root);
        fs::create_dir_all(&dir).map_err(|err| Error::io(&dir, err))?;

        let mut staged = tempfile::NamedTempFile::new_in(&dir).map_err(|err| Error::io(&dir, err))?;
        writeln!(staged, "{version}").map_err(|err| Error::io(staged.path(), err))?;
        staged
            .persist(&pointer)
            .map_err(|err| Error::io(&pointer, err.error))?;

        tracing::info!(%version, pointer = ?pointer, "global version updated");
        Ok(())
    }

    /// Activate a spec, expanding `latest` to the newest installed version.
    pub fn activate_spec(&self, spec: &VersionSpec) -> Result<Version> {
        let version = match spec {
            VersionSpec::Exact(version) => *version,
            VersionSpec::Latest => self
                .store
                .latest_installed()?
                .ok_or_else(|| requested_not_installed(spec))?,
        };

        match self.activate(&version) {
            Err(Error::NotFound(_)) => Err(requested_not_installed(&version)),
            other => other.map(|()| version),
        }
    }

    /// Write `shims/atmos` if it is missing or stale. Returns its path.
    pub fn ensure_shim(&self) -> Result<PathBuf> {
        let exe = env::current_exe().map_err(|err| Error::io("current executable", err))?;
        self.ensure_shim_for(&exe)
    }

    pub fn ensure_shim_for(&self, exe: &Path) -> Result<PathBuf> {
        let dir = self.shim_dir();
        let path = self.shim_path();
        let script = shim_script(exe);

        if fs::read_to_string(&path).ok().as_deref() != Some(script.as_str()) {
            fs::create_dir_all(&dir).map_err(|err| Error::io(&dir, err))?;
            fs::write(&path, script).map_err(|err| Error::io(&path, err))?;
            tracing::debug!(shim = ?path, "wrote shim");
        }
        make_executable(&path)?;
        Ok(path)
    }

    /// Installed version the shim would run from `cwd`.
    pub fn current(&self, cwd: &Path) -> Result<InstalledVersion> {
        let installed = self.resolver.resolve_installed(cwd, &self.store)?;
        if !installed.binary().is_file() {
            return Err(Error::NotFound(installed.version));
        }
        Ok(installed)
    }

    /// Run the selected binary with `args`, replacing this process on Unix.
    ///
    /// On Unix this returns only when resolution or `exec` fails; elsewhere it
    /// returns the child's exit code.
    pub fn dispatch(&self, args: &[OsString], cwd: &Path) -> Result<i32> {
        let installed = self.current(cwd)?;
        tracing::debug!(version = %installed.version, "dispatching");
        exec_binary(&installed.binary(), args)
    }
}

#[cfg(unix)]
fn exec_binary(binary: &Path, args: &[OsString]) -> Result<i32> {
    use std::os::unix::process::CommandExt;
    let err = Command::new(binary).args(args).exec();
    Err(Error::io(binary, err))
}

#[cfg(not(unix))]
fn exec_binary(binary: &Path, args: &[OsString]) -> Result<i32> {
    let status = Command::new(binary)
        .args(args)
        .status()
        .map_err(|err| Error::io(binary, err))?;
    Ok(status.code().unwrap_or(1))
}

fn requested_not_installed(version: &impl ToString) -> Error {
    Error::VersionNotInstalled {
        version: version.to_string(),
        source_desc: "requested".to_string(),
    }
}

/// Wrapper script that re-enters `atmosenv exec`.
fn shim_script(exe: &Path) -> String {
    let fallback = sh_quote(&exe.to_string_lossy());
    let mut script = String::from("#!/bin/sh\n# Managed by atmosenv; regenerated by 'atmosenv init'.\n");
    script.push_str(
        "if [ -n \"${ATMOSENV_ROOT:-}\" ] && [ -x \"$ATMOSENV_ROOT/bin/atmosenv\" ]; then\n  \
           exec \"$ATMOSENV_ROOT/bin/atmosenv\" exec -- \"$@\"\n\
         fi\n",
    );
    script.push_str(&format!("exec {fallback} exec -- \"$@\"\n"));
    script
}
