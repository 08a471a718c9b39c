// Public API
pub mod cli;
pub mod commands;
pub mod ui;

// Core domain types
mod catalog;
mod checksum;
mod config;
mod error;
mod installer;
mod paths;
mod receipt;
mod resolver;
mod shell;
mod shim;
mod store;
mod version;

// Re-export main types
pub use catalog::{GithubClient, Release, ReleaseAsset, ReleaseSource, RemoteCatalog, RemoteVersions};
pub use config::Config;
pub use error::{Error, Result};
pub use installer::{InstallOptions, InstallOutcome, InstallStage, Installer, Platform};
pub use paths::{ConfigRoot, RootPath, PROJECT_VERSION_FILE};
pub use receipt::InstallReceipt;
pub use resolver::{Resolution, VersionResolver, VersionSource, VERSION_OVERRIDE_ENV};
pub use shell::{emit, InitOptions, Shell};
pub use shim::ShimManager;
pub use store::{InstalledVersion, VersionStore};
pub use version::{Version, VersionSpec};
