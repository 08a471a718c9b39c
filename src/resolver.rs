//! Effective-version lookup.
//!
//! Precedence, highest first:
//! 1. `ATMOSENV_ATMOS_VERSION`
//! 2. the nearest `.atmos-version` in the working directory or its ancestors
//! 3. the global pointer file in the config root
//!
//! The resolver is a pure lookup: it reports the literal value it found.
//! Expanding `latest` against the store happens in [`VersionResolver::resolve_installed`].

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::{absolute_lexical, non_empty_var, ConfigRoot, RootPath, PROJECT_VERSION_FILE};
use crate::store::{InstalledVersion, VersionStore};
use crate::version::{first_version_line, VersionSpec};

pub const VERSION_OVERRIDE_ENV: &str = "ATMOSENV_ATMOS_VERSION";

/// Where a resolved version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    Environment,
    ProjectFile(PathBuf),
    GlobalPointer(PathBuf),
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::Environment => write!(f, "set by {VERSION_OVERRIDE_ENV}"),
            VersionSource::ProjectFile(path) | VersionSource::GlobalPointer(path) => {
                write!(f, "set by {}", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub spec: VersionSpec,
    pub source: VersionSource,
}

#[derive(Debug, Clone)]
pub struct VersionResolver {
    pointer: PathBuf,
    env_override: Option<String>,
}

impl VersionResolver {
    pub fn new(root: &ConfigRoot, env_override: Option<String>) -> Self {
        Self {
            pointer: root.path(RootPath::VersionPointer),
            env_override: env_override.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Resolver that reads the override from `ATMOSENV_ATMOS_VERSION`.
    pub fn from_env(root: &ConfigRoot) -> Self {
        Self::new(root, non_empty_var(VERSION_OVERRIDE_ENV))
    }

    pub fn resolve(&self, cwd: &Path) -> Result<Resolution> {
        if let Some(value) = &self.env_override {
            tracing::debug!(value = %value, "version selected by environment");
            return Ok(Resolution {
                spec: VersionSpec::parse(value)?,
                source: VersionSource::Environment,
            });
        }

        if let Some(resolution) = self.find_project_override(cwd)? {
            return Ok(resolution);
        }

        if let Some(value) = read_version_file(&self.pointer)? {
            tracing::debug!(pointer = ?self.pointer, value = %value, "version selected by global pointer");
            return Ok(Resolution {
                spec: VersionSpec::parse(&value)?,
                source: VersionSource::GlobalPointer(self.pointer.clone()),
            });
        }

        Err(Error::Unresolved)
    }

    /// Resolve and then map the result onto an installed version.
    ///
    /// `latest` expands to the newest installed version.
    pub fn resolve_installed(&self, cwd: &Path, store: &VersionStore) -> Result<InstalledVersion> {
        let resolution = self.resolve(cwd)?;
        let version = match resolution.spec {
            VersionSpec::Exact(version) => version,
            VersionSpec::Latest => store
                .latest_installed()?
                .ok_or_else(|| Error::not_installed(VersionSpec::Latest, &resolution.source))?,
        };

        store.get(&version).map_err(|err| match err {
            Error::NotFound(_) => Error::not_installed(version, &resolution.source),
            other => other,
        })
    }

    /// Walk the logical ancestors of `cwd` looking for `.atmos-version`.
    fn find_project_override(&self, cwd: &Path) -> Result<Option<Resolution>> {
        let start = normalize_lexical(&absolute_lexical(cwd)?);

        for dir in start.ancestors() {
            let candidate = dir.join(PROJECT_VERSION_FILE);
            let metadata = match fs::symlink_metadata(&candidate) {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(Error::io(&candidate, err)),
            };

            if metadata.is_dir() {
                continue;
            }
            if metadata.file_type().is_symlink() && !symlink_stays_within(&candidate, dir) {
                tracing::warn!(
                    path = ?candidate,
                    "ignoring .atmos-version symlink that points outside its project"
                );
                continue;
            }

            if let Some(value) = read_version_file(&candidate)? {
                tracing::debug!(path = ?candidate, value = %value, "version selected by project file");
                return Ok(Some(Resolution {
                    spec: VersionSpec::parse(&value)?,
                    source: VersionSource::ProjectFile(candidate),
                }));
            }
        }

        Ok(None)
    }
}

/// Read a single-line version file; missing or blank files yield `None`.
pub(crate) fn read_version_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(first_version_line(&contents).map(str::to_string)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::io(path, err)),
    }
}

fn symlink_stays_within(link: &Path, dir: &Path) -> bool {
    match (fs::canonicalize(link), fs::canonicalize(dir)) {
        (Ok(target), Ok(dir)) => target.starts_with(dir),
        _ => false,
    }
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        root: ConfigRoot,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = ConfigRoot::new(temp.path().join("config"));
            fs::create_dir_all(root.path(RootPath::Root)).unwrap();
            Self { temp, root }
        }

        fn project(&self) -> PathBuf {
            let dir = self.temp.path().join("work/project/module");
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn set_pointer(&self, value: &str) {
            fs::write(self.root.path(RootPath::VersionPointer), format!("{value}\n")).unwrap();
        }

        fn resolver(&self, env: Option<&str>) -> VersionResolver {
            VersionResolver::new(&self.root, env.map(str::to_string))
        }
    }

    fn exact(value: &str) -> VersionSpec {
        VersionSpec::Exact(Version::parse(value).unwrap())
    }

    #[test]
    fn precedence_env_then_project_then_pointer_then_unresolved() {
        let fixture = Fixture::new();
        let cwd = fixture.project();
        let project_file = fixture.temp.path().join("work/project").join(PROJECT_VERSION_FILE);
        fs::write(&project_file, "1.3.0\n").unwrap();
        fixture.set_pointer("1.1.0");

        let resolution = fixture.resolver(Some("1.2.0")).resolve(&cwd).unwrap();
        assert_eq!(resolution.spec, exact("1.2.0"));
        assert_eq!(resolution.source, VersionSource::Environment);

        let resolution = fixture.resolver(None).resolve(&cwd).unwrap();
        assert_eq!(resolution.spec, exact("1.3.0"));
        assert_eq!(resolution.source, VersionSource::ProjectFile(project_file.clone()));

        fs::remove_file(&project_file).unwrap();
        let resolution = fixture.resolver(None).resolve(&cwd).unwrap();
        assert_eq!(resolution.spec, exact("1.1.0"));
        assert!(matches!(resolution.source, VersionSource::GlobalPointer(_)));

        fs::remove_file(fixture.root.path(RootPath::VersionPointer)).unwrap();
        assert!(matches!(
            fixture.resolver(None).resolve(&cwd),
            Err(Error::Unresolved)
        ));
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let fixture = Fixture::new();
        fixture.set_pointer("1.1.0");
        let resolution = fixture.resolver(Some("   ")).resolve(&fixture.project()).unwrap();
        assert_eq!(resolution.spec, exact("1.1.0"));
    }

    #[test]
    fn nearest_ancestor_wins() {
        let fixture = Fixture::new();
        let cwd = fixture.project();
        fs::write(fixture.temp.path().join("work").join(PROJECT_VERSION_FILE), "1.0.0").unwrap();
        fs::write(cwd.join(PROJECT_VERSION_FILE), "# pinned for module\n1.5.0\n").unwrap();

        let resolution = fixture.resolver(None).resolve(&cwd).unwrap();
        assert_eq!(resolution.spec, exact("1.5.0"));
    }

    #[test]
    fn blank_project_file_falls_through() {
        let fixture = Fixture::new();
        let cwd = fixture.project();
        fs::write(cwd.join(PROJECT_VERSION_FILE), "\n\n").unwrap();
        fixture.set_pointer("1.1.0");

        let resolution = fixture.resolver(None).resolve(&cwd).unwrap();
        assert_eq!(resolution.spec, exact("1.1.0"));
    }

    #[test]
    fn latest_is_returned_literally() {
        let fixture = Fixture::new();
        fixture.set_pointer("latest");
        let resolution = fixture.resolver(None).resolve(&fixture.project()).unwrap();
        assert_eq!(resolution.spec, VersionSpec::Latest);
    }

    #[test]
    fn invalid_content_is_reported() {
        let fixture = Fixture::new();
        fixture.set_pointer("not-a-version");
        assert!(matches!(
            fixture.resolver(None).resolve(&fixture.project()),
            Err(Error::InvalidVersion(_))
        ));
    }

    #[test]
    fn parent_dir_components_are_collapsed() {
        assert_eq!(
            normalize_lexical(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_lexical(Path::new("/../..")), PathBuf::from("/"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_override_outside_project_is_skipped() {
        let fixture = Fixture::new();
        let cwd = fixture.project();
        let elsewhere = fixture.temp.path().join("other-project");
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(elsewhere.join(PROJECT_VERSION_FILE), "9.9.9").unwrap();
        std::os::unix::fs::symlink(
            elsewhere.join(PROJECT_VERSION_FILE),
            cwd.join(PROJECT_VERSION_FILE),
        )
        .unwrap();
        fixture.set_pointer("1.1.0");

        let resolution = fixture.resolver(None).resolve(&cwd).unwrap();
        assert_eq!(resolution.spec, exact("1.1.0"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_project_dir_walks_logical_parents() {
        let fixture = Fixture::new();
        // Real tree: /elsewhere/.atmos-version + /elsewhere/checkout
        let real_parent = fixture.temp.path().join("elsewhere");
        let real_checkout = real_parent.join("checkout");
        fs::create_dir_all(&real_checkout).unwrap();
        fs::write(real_parent.join(PROJECT_VERSION_FILE), "9.9.9").unwrap();

        // Logical tree: /work/.atmos-version + /work/link -> /elsewhere/checkout
        let work = fixture.temp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join(PROJECT_VERSION_FILE), "1.4.0").unwrap();
        let link = work.join("link");
        std::os::unix::fs::symlink(&real_checkout, &link).unwrap();

        let resolution = fixture.resolver(None).resolve(&link).unwrap();
        assert_eq!(resolution.spec, exact("1.4.0"));
    }

    #[test]
    fn resolve_installed_distinguishes_missing_installs() {
        let fixture = Fixture::new();
        let store = VersionStore::new(fixture.root.clone());
        let cwd = fixture.project();

        assert!(matches!(
            fixture.resolver(None).resolve_installed(&cwd, &store),
            Err(Error::Unresolved)
        ));

        fixture.set_pointer("1.1.0");
        assert!(matches!(
            fixture.resolver(None).resolve_installed(&cwd, &store),
            Err(Error::VersionNotInstalled { .. })
        ));

        fs::create_dir_all(fixture.root.version_dir(&Version::new(1, 1, 0))).unwrap();
        let installed = fixture.resolver(None).resolve_installed(&cwd, &store).unwrap();
        assert_eq!(installed.version, Version::new(1, 1, 0));
    }

    #[test]
    fn resolve_installed_expands_latest_to_newest_install() {
        let fixture = Fixture::new();
        let store = VersionStore::new(fixture.root.clone());
        fixture.set_pointer("latest");

        assert!(matches!(
            fixture.resolver(None).resolve_installed(&fixture.project(), &store),
            Err(Error::VersionNotInstalled { .. })
        ));

        for version in ["1.2.0", "1.10.0", "1.9.0"] {
            fs::create_dir_all(fixture.root.version_dir(&Version::parse(version).unwrap())).unwrap();
        }
        let installed = fixture
            .resolver(None)
            .resolve_installed(&fixture.project(), &store)
            .unwrap();
        assert_eq!(installed.version, Version::new(1, 10, 0));
    }
}
