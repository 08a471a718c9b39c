use std::fs;
use std::io;
use std::path::PathBuf;

use crate::checksum::{compute_sha256, format_digest};
use crate::error::{Error, Result};
use crate::paths::{ConfigRoot, RootPath, TOOL_BINARY};
use crate::receipt::InstallReceipt;
use crate::version::Version;

/// A version present in the store together with where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: Version,
    pub path: PathBuf,
}

impl InstalledVersion {
    pub fn binary(&self) -> PathBuf {
        self.path.join(TOOL_BINARY)
    }
}

/// Directory-backed registry of installed versions under `versions/`.
///
/// Only directories whose names parse as a [`Version`] count as installs;
/// staging directories and lock files are dot-prefixed and never match.
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: ConfigRoot,
}

impl VersionStore {
    pub fn new(root: ConfigRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ConfigRoot {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.path(RootPath::Versions)
    }

    /// Installed versions in ascending order.
    pub fn list(&self) -> Result<Vec<Version>> {
        let dir = self.versions_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::io(&dir, err)),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| Error::io(&dir, err))?;
            let file_type = entry.file_type().map_err(|err| Error::io(entry.path(), err))?;
            if !file_type.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            // Directory names are written without the tag prefix.
            if name.starts_with('v') {
                continue;
            }
            match Version::parse(name) {
                Ok(version) => versions.push(version),
                Err(_) => tracing::debug!(entry = %name, "ignoring non-version entry in store"),
            }
        }

        versions.sort();
        Ok(versions)
    }

    pub fn has(&self, version: &Version) -> bool {
        self.root.version_dir(version).is_dir()
    }

    pub fn path(&self, version: &Version) -> Result<PathBuf> {
        let dir = self.root.version_dir(version);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::NotFound(*version))
        }
    }

    pub fn get(&self, version: &Version) -> Result<InstalledVersion> {
        Ok(InstalledVersion {
            version: *version,
            path: self.path(version)?,
        })
    }

    pub fn binary(&self, version: &Version) -> Result<PathBuf> {
        self.get(version).map(|installed| installed.binary())
    }

    pub fn latest_installed(&self) -> Result<Option<Version>> {
        Ok(self.list()?.pop())
    }

    /// Delete an installed version's directory tree.
    pub fn remove(&self, version: &Version) -> Result<()> {
        let dir = self.path(version)?;
        fs::remove_dir_all(&dir).map_err(|err| Error::io(&dir, err))?;
        tracing::info!(%version, "removed installed version");
        Ok(())
    }

    pub fn receipt(&self, version: &Version) -> Result<InstallReceipt> {
        InstallReceipt::load(&self.path(version)?)
    }

    /// Re-hash the installed binary and compare it with the install receipt.
    pub fn verify(&self, version: &Version) -> Result<()> {
        let installed = self.get(version)?;
        let receipt = InstallReceipt::load(&installed.path)?;
        let actual = format_digest(&compute_sha256(&installed.binary())?);

        if actual != receipt.binary_sha256 {
            return Err(Error::integrity(
                installed.binary().display().to_string(),
                format!(
                    "expected sha256 {} but found {}",
                    receipt.binary_sha256, actual
                ),
            ));
        }
        Ok(())
    }
}
