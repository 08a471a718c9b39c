use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;

use crate::checksum::Sha256Digest;
use crate::error::{Error, Result};
use crate::version::Version;

mod github;
pub use github::GithubClient;

/// Releases requested per page from upstream.
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

impl Release {
    /// The plain version this release publishes, if it is a stable release.
    pub fn stable_version(&self) -> Option<Version> {
        if self.draft || self.prerelease {
            return None;
        }
        Version::parse(&self.tag_name).ok()
    }

    pub fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// Upstream release feed.
///
/// Implementations surface failures as [`Error::Network`] / [`Error::RateLimited`]
/// and never retry.
pub trait ReleaseSource {
    /// One page of releases, newest published first. Pages start at 1.
    fn releases_page(&self, page: u32, per_page: u32) -> Result<Vec<Release>>;

    /// Newest non-prerelease release.
    fn latest_release(&self) -> Result<Release>;

    fn release_by_tag(&self, tag: &str) -> Result<Release>;

    /// Fetch a text asset such as a checksum manifest.
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// Stream an asset to `dest`, returning the SHA-256 of the bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<Sha256Digest>;
}

/// Version listing and lookup over a [`ReleaseSource`].
pub struct RemoteCatalog<S> {
    source: S,
}

impl<S: ReleaseSource> RemoteCatalog<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Lazily page through upstream releases, newest published first.
    ///
    /// `limit` caps the number of versions yielded; `None` walks every page.
    pub fn versions(&self, limit: Option<usize>) -> RemoteVersions<'_, S> {
        RemoteVersions {
            source: &self.source,
            next_page: 1,
            buffer: VecDeque::new(),
            remaining: limit,
            exhausted: false,
        }
    }

    /// The `limit` highest remote versions, in descending version order.
    ///
    /// Upstream publishes backports after newer majors, so every page is read
    /// before the list is sorted and cut.
    pub fn list_remote(&self, limit: Option<usize>) -> Result<Vec<Version>> {
        let mut versions = self.versions(None).collect::<Result<Vec<_>>>()?;
        versions.sort_by(|a, b| b.cmp(a));
        versions.dedup();
        if let Some(limit) = limit {
            versions.truncate(limit);
        }
        Ok(versions)
    }

    pub fn resolve_latest(&self) -> Result<Version> {
        let release = self.source.latest_release()?;
        release.stable_version().ok_or_else(|| {
            Error::Network(format!(
                "latest upstream release '{}' is not a stable version",
                release.tag_name
            ))
        })
    }

    pub fn release(&self, version: &Version) -> Result<Release> {
        self.source.release_by_tag(&version.tag())
    }
}

pub struct RemoteVersions<'a, S> {
    source: &'a S,
    next_page: u32,
    buffer: VecDeque<Version>,
    remaining: Option<usize>,
    exhausted: bool,
}

impl<S: ReleaseSource> RemoteVersions<'_, S> {
    fn fill(&mut self) -> Result<()> {
        while self.buffer.is_empty() && !self.exhausted {
            let page = self.source.releases_page(self.next_page, PAGE_SIZE)?;
            tracing::debug!(page = self.next_page, releases = page.len(), "fetched release page");
            self.next_page += 1;
            if page.len() < PAGE_SIZE as usize {
                self.exhausted = true;
            }
            self.buffer
                .extend(page.iter().filter_map(Release::stable_version));
        }
        Ok(())
    }
}

impl<S: ReleaseSource> Iterator for RemoteVersions<'_, S> {
    type Item = Result<Version>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }

        if let Err(err) = self.fill() {
            // A failed page ends the listing; the caller decides whether to retry.
            self.exhausted = true;
            self.buffer.clear();
            self.remaining = Some(0);
            return Some(Err(err));
        }

        let version = self.buffer.pop_front()?;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(Ok(version))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{release, FakeSource};
    use super::*;

    fn many_tags(count: u32) -> Vec<String> {
        (0..count).rev().map(|minor| format!("v1.{minor}.0")).collect()
    }

    #[test]
    fn list_remote_with_limit_returns_descending_versions() {
        let source = FakeSource::with_tags(&["v1.4.0", "v1.5.0", "v1.3.2", "v1.3.1", "v1.3.0", "v1.2.0"]);
        let catalog = RemoteCatalog::new(source);

        let listed: Vec<String> = catalog
            .list_remote(Some(5))
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(listed, ["1.5.0", "1.4.0", "1.3.2", "1.3.1", "1.3.0"]);
    }

    #[test]
    fn limit_keeps_highest_versions_despite_backports() {
        let source = FakeSource::with_tags(&["v1.4.3", "v2.0.0", "v1.9.0", "v2.0.0"]);
        let catalog = RemoteCatalog::new(source);

        assert_eq!(catalog.list_remote(Some(1)).unwrap(), [Version::new(2, 0, 0)]);
        assert_eq!(
            catalog.list_remote(Some(2)).unwrap(),
            [Version::new(2, 0, 0), Version::new(1, 9, 0)]
        );
    }

    #[test]
    fn prereleases_drafts_and_odd_tags_are_skipped() {
        let mut source = FakeSource::with_tags(&["v2.0.0-rc1", "v1.9.0", "nightly", "v1.8.0"]);
        source.releases.push(release("v3.0.0", true));
        let mut draft = release("v4.0.0", false);
        draft.draft = true;
        source.releases.push(draft);

        let catalog = RemoteCatalog::new(source);
        let listed = catalog.list_remote(None).unwrap();
        assert_eq!(listed, [Version::new(1, 9, 0), Version::new(1, 8, 0)]);
    }

    #[test]
    fn pagination_is_lazy_and_transparent() {
        let tags = many_tags(250);
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let catalog = RemoteCatalog::new(FakeSource::with_tags(&tag_refs));

        let first: Vec<Version> = catalog
            .versions(Some(5))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(catalog.source().pages_fetched.get(), 1);

        catalog.source().pages_fetched.set(0);
        let all = catalog.list_remote(None).unwrap();
        assert_eq!(all.len(), 250);
        assert_eq!(all[0], Version::new(1, 249, 0));
        assert_eq!(catalog.source().pages_fetched.get(), 3);
    }

    #[test]
    fn limit_beyond_upstream_returns_everything() {
        let catalog = RemoteCatalog::new(FakeSource::with_tags(&["v1.0.0", "v0.9.0"]));
        assert_eq!(catalog.list_remote(Some(10)).unwrap().len(), 2);
    }

    #[test]
    fn page_failure_surfaces_once_without_retry() {
        let tags = many_tags(150);
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let mut source = FakeSource::with_tags(&tag_refs);
        source.fail_page = Some(2);
        let catalog = RemoteCatalog::new(source);

        let err = catalog.list_remote(None).unwrap_err();
        assert!(matches!(err, Error::RateLimited { .. }));
        assert_eq!(catalog.source().pages_fetched.get(), 2);
    }

    #[test]
    fn resolve_latest_picks_newest_stable() {
        let mut source = FakeSource::with_tags(&["v1.2.0", "v1.10.0", "v1.9.0"]);
        source.releases.push(release("v2.0.0", true));
        let catalog = RemoteCatalog::new(source);
        assert_eq!(catalog.resolve_latest().unwrap(), Version::new(1, 10, 0));
    }

    #[test]
    fn parse_release_payload() {
        let payload = r#"
        {
            "id": 1,
            "tag_name": "v1.90.0",
            "name": "v1.90.0",
            "draft": false,
            "prerelease": false,
            "assets": [
                {
                    "id": 10,
                    "name": "atmos_1.90.0_linux_amd64",
                    "browser_download_url": "https://example.com/atmos_1.90.0_linux_amd64",
                    "size": 1024,
                    "state": "uploaded"
                }
            ]
        }
        "#;
        let release: Release = serde_json::from_str(payload).unwrap();
        assert_eq!(release.stable_version(), Some(Version::new(1, 90, 0)));
        assert!(release.asset("atmos_1.90.0_linux_amd64").is_some());
        assert!(release.asset("atmos_1.90.0_darwin_arm64").is_none());
    }
}
