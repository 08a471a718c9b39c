use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::version::Version;

/// File name of the receipt inside each `versions/<v>/` directory.
pub const RECEIPT_FILE: &str = ".atmosenv-receipt.toml";

/// Install receipt (similar to a lockfile entry)
/// Records what was downloaded and what ended up on disk for one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Version of the receipt format
    format: u32,
    /// Version string as requested (may be "latest")
    pub requested: String,
    /// Concrete version that was installed
    pub version: Version,
    /// Release asset that was downloaded
    pub asset: String,
    pub source_url: String,
    /// SHA-256 of the downloaded artifact, hex encoded
    pub artifact_sha256: String,
    /// SHA-256 of the installed binary, hex encoded
    pub binary_sha256: String,
    /// When this version was installed (RFC 3339)
    pub installed_at: String,
}

impl InstallReceipt {
    pub fn new(
        requested: impl Into<String>,
        version: Version,
        asset: impl Into<String>,
        source_url: impl Into<String>,
        artifact_sha256: impl Into<String>,
        binary_sha256: impl Into<String>,
    ) -> Self {
        Self {
            format: 1,
            requested: requested.into(),
            version,
            asset: asset.into(),
            source_url: source_url.into(),
            artifact_sha256: artifact_sha256.into(),
            binary_sha256: binary_sha256.into(),
            installed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn path_in(version_dir: &Path) -> PathBuf {
        version_dir.join(RECEIPT_FILE)
    }

    /// Load the receipt stored in a version directory
    pub fn load(version_dir: &Path) -> Result<Self> {
        let path = Self::path_in(version_dir);
        let contents = fs::read_to_string(&path).map_err(|err| Error::io(&path, err))?;

        toml::from_str(&contents)
            .map_err(|err| Error::Config(format!("Failed to parse receipt {:?}: {err}", path)))
    }

    /// Save the receipt into a version (or staging) directory
    pub fn save(&self, version_dir: &Path) -> Result<()> {
        let path = Self::path_in(version_dir);
        let contents = toml::to_string_pretty(self)
            .map_err(|err| Error::Config(format!("Failed to serialize receipt: {err}")))?;

        fs::write(&path, contents).map_err(|err| Error::io(&path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_receipt_save_load() {
        let temp = TempDir::new().unwrap();
        let receipt = InstallReceipt::new(
            "latest",
            Version::new(1, 90, 0),
            "atmos_1.90.0_linux_amd64",
            "https://example.com/atmos_1.90.0_linux_amd64",
            "aa".repeat(32),
            "bb".repeat(32),
        );

        receipt.save(temp.path()).unwrap();
        assert!(temp.path().join(RECEIPT_FILE).exists());

        let loaded = InstallReceipt::load(temp.path()).unwrap();
        assert_eq!(loaded, receipt);
        assert_eq!(loaded.requested, "latest");
        assert_eq!(loaded.version, Version::new(1, 90, 0));
        assert!(!loaded.installed_at.is_empty());
    }

    #[test]
    fn test_receipt_missing_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = InstallReceipt::load(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
