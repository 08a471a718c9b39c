//! Staged installs into the version store.
//!
//! Every install walks Fetching → Verifying → Staging → Committing → Linking.
//! All work happens in a hidden staging directory next to `versions/<v>`; the
//! only step that touches the final path is a single `rename`. Dropping the
//! staging directory on any error is the rollback.

use std::env::consts;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::catalog::{Release, ReleaseAsset, ReleaseSource, RemoteCatalog};
use crate::checksum::{compute_sha256, find_in_manifest, format_digest, parse_sha256};
use crate::error::{Error, Result};
use crate::paths::TOOL_BINARY;
use crate::receipt::InstallReceipt;
use crate::shim::ShimManager;
use crate::store::{InstalledVersion, VersionStore};
use crate::version::{Version, VersionSpec};

pub mod archive;
mod lock;

use lock::{lock_path, InstallLock};

const STAGING_PREFIX: &str = ".staging-";
const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".zip", ".tar.xz"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Fetching,
    Verifying,
    Staging,
    Committing,
    Linking,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Fetching => "fetching",
            InstallStage::Verifying => "verifying",
            InstallStage::Staging => "staging",
            InstallStage::Committing => "committing",
            InstallStage::Linking => "linking",
        };
        f.write_str(name)
    }
}

/// Release asset naming for the host: `atmos_<version>_<os>_<arch>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        let os = match consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(os, arch)
    }

    pub fn asset_stem(&self, version: &Version) -> String {
        format!("atmos_{version}_{}_{}", self.os, self.arch)
    }

    /// Asset names to try, raw binary first.
    fn candidates(&self, version: &Version) -> Vec<String> {
        let stem = self.asset_stem(version);
        let raw = if self.os == "windows" {
            format!("{stem}.exe")
        } else {
            stem.clone()
        };

        std::iter::once(raw)
            .chain(ARCHIVE_SUFFIXES.iter().map(|suffix| format!("{stem}{suffix}")))
            .collect()
    }

    pub fn select_asset<'a>(&self, release: &'a Release, version: &Version) -> Result<&'a ReleaseAsset> {
        self.candidates(version)
            .iter()
            .find_map(|name| release.asset(name))
            .ok_or_else(|| Error::NoMatchingAsset {
                version: *version,
                platform: self.to_string(),
            })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn checksum_asset(release: &Release) -> Option<&ReleaseAsset> {
    release.assets.iter().find(|asset| {
        let lowered = asset.name.to_ascii_lowercase();
        lowered.contains("sha256sums") || lowered == "checksums.txt"
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Point the global selection at the installed version once committed
    pub activate: bool,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub installed: InstalledVersion,
    /// The version was already in the store; nothing was downloaded
    pub already_present: bool,
    pub activated: bool,
}

pub struct Installer<'a, S> {
    store: &'a VersionStore,
    catalog: &'a RemoteCatalog<S>,
    platform: Platform,
}

impl<'a, S: ReleaseSource> Installer<'a, S> {
    pub fn new(store: &'a VersionStore, catalog: &'a RemoteCatalog<S>) -> Self {
        Self::for_platform(store, catalog, Platform::current())
    }

    pub fn for_platform(store: &'a VersionStore, catalog: &'a RemoteCatalog<S>, platform: Platform) -> Self {
        Self {
            store,
            catalog,
            platform,
        }
    }

    /// Install `spec`, resolving `latest` upstream first.
    ///
    /// Installing a version that is already present is a successful no-op.
    pub fn install(&self, spec: &VersionSpec, options: InstallOptions) -> Result<InstallOutcome> {
        let version = match spec {
            VersionSpec::Exact(version) => *version,
            VersionSpec::Latest => {
                let latest = self.catalog.resolve_latest()?;
                tracing::info!(%latest, "resolved latest upstream version");
                latest
            }
        };

        if self.store.has(&version) {
            return self.finish(version, true, options);
        }

        let versions_dir = self.store.versions_dir();
        fs::create_dir_all(&versions_dir).map_err(|err| Error::io(&versions_dir, err))?;

        let _lock = InstallLock::acquire(&lock_path(&versions_dir, &version))?;
        if self.store.has(&version) {
            tracing::info!(%version, "installed by a concurrent process");
            return self.finish(version, true, options);
        }

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&versions_dir)
            .map_err(|err| Error::io(&versions_dir, err))?;

        self.stage(spec, &version, staging.path())?;

        log_stage(InstallStage::Committing, &version);
        let target = self.store.root().version_dir(&version);
        let staged_root = staging.path().join("root");
        fs::rename(&staged_root, &target).map_err(|err| Error::io(&target, err))?;

        self.finish(version, false, options)
    }

    /// Fetching, Verifying and Staging. Leaves a complete tree at `staging/root`.
    fn stage(&self, spec: &VersionSpec, version: &Version, staging: &Path) -> Result<()> {
        log_stage(InstallStage::Fetching, version);
        let release = self.catalog.release(version)?;
        let asset = self.platform.select_asset(&release, version)?;
        let artifact = staging.join(&asset.name);
        let artifact_digest = self
            .catalog
            .source()
            .download(&asset.browser_download_url, &artifact)?;

        log_stage(InstallStage::Verifying, version);
        check_size(asset, &artifact)?;
        self.verify(&release, asset, &artifact_digest)?;

        log_stage(InstallStage::Staging, version);
        let root = staging.join("root");
        let binary = archive::stage_binary(&artifact, &asset.name, &root, TOOL_BINARY)?;
        let binary_digest = compute_sha256(&binary)?;

        InstallReceipt::new(
            spec.to_string(),
            *version,
            asset.name.clone(),
            asset.browser_download_url.clone(),
            format_digest(&artifact_digest),
            format_digest(&binary_digest),
        )
        .save(&root)
    }

    fn verify(&self, release: &Release, asset: &ReleaseAsset, actual: &[u8; 32]) -> Result<()> {
        let manifest_asset = checksum_asset(release).ok_or_else(|| {
            Error::integrity(&asset.name, "release does not publish a SHA256 checksum manifest")
        })?;
        let manifest = self
            .catalog
            .source()
            .fetch_text(&manifest_asset.browser_download_url)?;

        let expected = find_in_manifest(&manifest, &asset.name).ok_or_else(|| {
            Error::integrity(
                &asset.name,
                format!("no entry in checksum manifest {}", manifest_asset.name),
            )
        })?;
        let expected = parse_sha256(&expected)?;

        if &expected != actual {
            return Err(Error::integrity(
                &asset.name,
                format!(
                    "expected sha256 {} but downloaded {}",
                    format_digest(&expected),
                    format_digest(actual)
                ),
            ));
        }

        tracing::debug!(asset = %asset.name, "checksum verified");
        Ok(())
    }

    fn finish(&self, version: Version, already_present: bool, options: InstallOptions) -> Result<InstallOutcome> {
        let installed = self.store.get(&version)?;

        if options.activate {
            log_stage(InstallStage::Linking, &version);
            ShimManager::new(self.store.clone()).activate(&version)?;
        }

        Ok(InstallOutcome {
            installed,
            already_present,
            activated: options.activate,
        })
    }
}

/// Compare the download against the size the release advertises. Zero means unknown.
fn check_size(asset: &ReleaseAsset, artifact: &Path) -> Result<()> {
    if asset.size == 0 {
        return Ok(());
    }
    let actual = fs::metadata(artifact)
        .map_err(|err| Error::io(artifact, err))?
        .len();
    if actual != asset.size {
        return Err(Error::integrity(
            &asset.name,
            format!("expected {} bytes but downloaded {actual}", asset.size),
        ));
    }
    Ok(())
}

fn log_stage(stage: InstallStage, version: &Version) {
    tracing::info!(%stage, %version, "install stage");
}
