use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::paths::{non_empty_var, ConfigRoot, RootPath};

const DEFAULT_GITHUB_REPO: &str = "cloudposse/atmos";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings read from `config.toml` in the config root, overridable from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Upstream repository publishing Atmos releases (`owner/name`)
    #[serde(default = "default_github_repo")]
    pub github_repo: String,
    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Install the directory-change hook in `init -` output
    #[serde(default = "default_true")]
    pub shell_hook: bool,
    #[serde(skip)]
    pub github_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_repo: default_github_repo(),
            api_url: default_api_url(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            shell_hook: true,
            github_token: None,
        }
    }
}

impl Config {
    /// Load `config.toml` from the root (if present) and apply environment overrides.
    pub fn load(root: &ConfigRoot) -> Result<Self> {
        let mut config = Self::load_file(&root.path(RootPath::ConfigFile))?;
        config.apply_env()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        toml::from_str(&contents)
            .map_err(|err| Error::Config(format!("Failed to parse config file {:?}: {err}", path)))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(repo) = non_empty_var("ATMOSENV_GITHUB_REPO") {
            self.github_repo = repo;
        }
        if let Some(api_url) = non_empty_var("ATMOSENV_GITHUB_API_URL") {
            self.api_url = api_url;
        }
        if let Some(timeout) = non_empty_var("ATMOSENV_HTTP_TIMEOUT") {
            self.http_timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "ATMOSENV_HTTP_TIMEOUT must be a whole number of seconds, got '{timeout}'"
                ))
            })?;
        }
        self.github_token =
            non_empty_var("ATMOSENV_GITHUB_TOKEN").or_else(|| non_empty_var("GITHUB_TOKEN"));
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_github_repo() -> String {
    DEFAULT_GITHUB_REPO.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}
