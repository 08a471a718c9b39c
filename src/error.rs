//! Error types for atmosenv operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::resolver::VersionSource;
use crate::version::Version;

/// Convenience Result type with the atmosenv [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the version store, resolver, catalog, installer and shim.
#[derive(Error, Debug)]
pub enum Error {
    /// Store lookup for a version that is not installed
    #[error("Atmos {0} is not installed")]
    NotFound(Version),

    /// Nothing in the precedence chain selected a version
    #[error(
        "No version selected. Set one with 'atmosenv use <version>', add a .atmos-version file, or set ATMOSENV_ATMOS_VERSION"
    )]
    Unresolved,

    /// A pointer or override names a version absent from the store
    #[error("Atmos version '{version}' ({source_desc}) is not installed. Run 'atmosenv install {version}' to install it")]
    VersionNotInstalled {
        version: String,
        source_desc: String,
    },

    /// Input that is neither `latest` nor `MAJOR.MINOR.PATCH`
    #[error("Invalid version '{0}': expected MAJOR.MINOR.PATCH or 'latest'")]
    InvalidVersion(String),

    /// Checksum mismatch or missing checksum for a downloaded artifact
    #[error("Integrity check failed for {artifact}: {reason}")]
    Integrity { artifact: String, reason: String },

    /// Connectivity, timeout or unexpected HTTP failure
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream asked us to slow down
    #[error("{}", rate_limited_message(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Upstream has no release for the requested tag
    #[error("No upstream release found for Atmos {0}")]
    ReleaseNotFound(Version),

    /// Release exists but publishes nothing for this platform
    #[error("Release {version} has no asset for {platform}")]
    NoMatchingAsset { version: Version, platform: String },

    /// Shell name not recognized by the init emitter
    #[error("Unsupported shell '{0}'. Supported shells: bash, zsh, fish, posix")]
    UnsupportedShell(String),

    /// Filesystem failure
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file or environment could not be interpreted
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_installed(version: impl ToString, source: &VersionSource) -> Self {
        Self::VersionNotInstalled {
            version: version.to_string(),
            source_desc: source.to_string(),
        }
    }

    pub(crate) fn integrity(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Integrity {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out: {err}"))
        } else {
            Error::Network(err.to_string())
        }
    }
}

fn rate_limited_message(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(wait) => format!(
            "Rate limited by the release API; retry after {}s (set GITHUB_TOKEN to raise the limit)",
            wait.as_secs()
        ),
        None => "Rate limited by the release API (set GITHUB_TOKEN to raise the limit)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_message_mentions_no_version() {
        let message = Error::Unresolved.to_string().to_lowercase();
        assert!(message.contains("no version"));
    }

    #[test]
    fn rate_limited_surfaces_retry_hint() {
        let err = Error::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        };
        assert!(err.to_string().contains("retry after 42s"));

        let err = Error::RateLimited { retry_after: None };
        assert!(!err.to_string().contains("retry after"));
    }

    #[test]
    fn not_installed_includes_install_hint() {
        let err = Error::not_installed("1.2.3", &VersionSource::Environment);
        let message = err.to_string();
        assert!(message.contains("atmosenv install 1.2.3"));
        assert!(message.contains("ATMOSENV_ATMOS_VERSION"));
    }
}
