use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::version::Version;

pub const CONFIG_DIR_ENV: &str = "ATMOSENV_CONFIG_DIR";
pub const ROOT_ENV: &str = "ATMOSENV_ROOT";
const APP_DIR: &str = "atmosenv";

/// Name of the project-local override file.
pub const PROJECT_VERSION_FILE: &str = ".atmos-version";

/// Name of the managed binary inside each version directory.
#[cfg(windows)]
pub const TOOL_BINARY: &str = "atmos.exe";
#[cfg(not(windows))]
pub const TOOL_BINARY: &str = "atmos";

/// Well-known locations under the config root
#[derive(Debug, Clone, Copy)]
pub enum RootPath {
    /// Config root: $ATMOSENV_CONFIG_DIR or $XDG_CONFIG_HOME/atmosenv
    Root,
    /// Installed versions: root/versions
    Versions,
    /// Global pointer file: root/version
    VersionPointer,
    /// Shim directory prepended to PATH: root/shims
    Shims,
    /// Optional settings: root/config.toml
    ConfigFile,
}

/// The per-user config root holding installs, the pointer and the shims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    root: PathBuf,
}

impl ConfigRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the config root from the environment
    ///
    /// Precedence: `$ATMOSENV_CONFIG_DIR`, then `$XDG_CONFIG_HOME/atmosenv`,
    /// then `~/.config/atmosenv`.
    pub fn from_env() -> Result<Self> {
        if let Some(dir) = non_empty_var(CONFIG_DIR_ENV) {
            let expanded = shellexpand::tilde(&dir);
            return Ok(Self::new(PathBuf::from(expanded.as_ref())));
        }

        let base = match non_empty_var("XDG_CONFIG_HOME") {
            Some(xdg) => PathBuf::from(xdg),
            None => home_dir()?.join(".config"),
        };

        Ok(Self::new(base.join(APP_DIR)))
    }

    /// Get path for a specific config root location
    pub fn path(&self, path_type: RootPath) -> PathBuf {
        match path_type {
            RootPath::Root => self.root.clone(),
            RootPath::Versions => self.root.join("versions"),
            RootPath::VersionPointer => self.root.join("version"),
            RootPath::Shims => self.root.join("shims"),
            RootPath::ConfigFile => self.root.join("config.toml"),
        }
    }

    pub fn version_dir(&self, version: &Version) -> PathBuf {
        self.path(RootPath::Versions).join(version.to_string())
    }
}

/// Install prefix supplied by the package wrapper, if any.
pub fn install_prefix() -> Option<PathBuf> {
    non_empty_var(ROOT_ENV).map(PathBuf::from)
}

/// Get the home directory
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| Error::Config("Failed to determine home directory".to_string()))
}

pub(crate) fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// The working directory as the shell spelled it.
///
/// `current_dir()` comes back with every symlink resolved. `$PWD` keeps the
/// logical path and is used whenever it still names the same directory.
pub fn logical_cwd() -> Result<PathBuf> {
    let physical = env::current_dir().map_err(|err| Error::io(".", err))?;
    Ok(prefer_pwd(env::var_os("PWD").map(PathBuf::from), physical))
}

fn prefer_pwd(pwd: Option<PathBuf>, physical: PathBuf) -> PathBuf {
    match pwd {
        Some(pwd) if pwd.is_absolute() && same_file::is_same_file(&pwd, &physical).unwrap_or(false) => pwd,
        _ => physical,
    }
}

/// Make `path` absolute against the logical cwd without resolving symlinks.
pub(crate) fn absolute_lexical(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(logical_cwd()?.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn config_dir_env_wins() {
        let temp = TempDir::new().unwrap();
        env::set_var(CONFIG_DIR_ENV, temp.path().join("custom"));
        env::set_var("XDG_CONFIG_HOME", temp.path().join("xdg"));

        let root = ConfigRoot::from_env().unwrap();
        assert_eq!(root.path(RootPath::Root), temp.path().join("custom"));

        env::remove_var(CONFIG_DIR_ENV);
        env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    #[serial]
    fn xdg_config_home_is_used_when_no_override() {
        let temp = TempDir::new().unwrap();
        env::remove_var(CONFIG_DIR_ENV);
        env::set_var("XDG_CONFIG_HOME", temp.path());

        let root = ConfigRoot::from_env().unwrap();
        assert_eq!(root.path(RootPath::Root), temp.path().join("atmosenv"));

        env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    #[serial]
    fn falls_back_to_home_config() {
        env::remove_var(CONFIG_DIR_ENV);
        env::remove_var("XDG_CONFIG_HOME");

        let root = ConfigRoot::from_env().unwrap();
        let rendered = root.path(RootPath::Root).to_string_lossy().into_owned();
        assert!(rendered.ends_with(".config/atmosenv"));
    }

    #[test]
    fn layout_matches_expected_names() {
        let root = ConfigRoot::new("/cfg");
        assert_eq!(root.path(RootPath::Versions), PathBuf::from("/cfg/versions"));
        assert_eq!(
            root.path(RootPath::VersionPointer),
            PathBuf::from("/cfg/version")
        );
        assert_eq!(root.path(RootPath::Shims), PathBuf::from("/cfg/shims"));
        assert_eq!(
            root.version_dir(&Version::new(1, 2, 3)),
            PathBuf::from("/cfg/versions/1.2.3")
        );
    }

    #[cfg(unix)]
    #[test]
    fn pwd_through_symlink_is_kept() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("elsewhere/checkout");
        fs_create(&real);
        let link = temp.path().join("work/link");
        fs_create(link.parent().unwrap());
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let physical = real.canonicalize().unwrap();
        assert_eq!(prefer_pwd(Some(link.clone()), physical.clone()), link);
    }

    #[test]
    fn stale_or_relative_pwd_is_ignored() {
        let temp = TempDir::new().unwrap();
        let here = temp.path().join("here");
        let there = temp.path().join("there");
        fs_create(&here);
        fs_create(&there);

        assert_eq!(prefer_pwd(Some(there), here.clone()), here);
        assert_eq!(prefer_pwd(Some(PathBuf::from("here")), here.clone()), here);
        assert_eq!(prefer_pwd(None, here.clone()), here);
    }

    fn fs_create(path: &Path) {
        std::fs::create_dir_all(path).unwrap();
    }
}
