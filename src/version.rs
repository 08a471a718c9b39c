use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Literal accepted anywhere a version can be requested.
pub const LATEST: &str = "latest";

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)$").expect("version pattern is a valid regex")
    })
}

/// A concrete Atmos release, `MAJOR.MINOR.PATCH`.
///
/// Ordering is numeric per component, so `1.10.0 > 1.9.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version, accepting a single leading `v` as used by upstream tags.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let captures = version_pattern()
            .captures(trimmed)
            .ok_or_else(|| Error::InvalidVersion(trimmed.to_string()))?;

        let component = |index: usize| -> Result<u64> {
            captures[index]
                .parse::<u64>()
                .map_err(|_| Error::InvalidVersion(trimmed.to_string()))
        };

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }

    /// Upstream git tag for this version.
    pub fn tag(&self) -> String {
        format!("v{self}")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// What a user asked for: a concrete version or `latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    Latest,
    Exact(Version),
}

impl VersionSpec {
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(LATEST) {
            Ok(Self::Latest)
        } else {
            Version::parse(trimmed).map(Self::Exact)
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Exact(version) => version.fmt(f),
        }
    }
}

impl FromStr for VersionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Version> for VersionSpec {
    fn from(version: Version) -> Self {
        Self::Exact(version)
    }
}

/// Read the first meaningful line of a single-line version file.
///
/// Blank lines and `#` comments are skipped. Returns `None` when nothing is left.
pub(crate) fn first_version_line(contents: &str) -> Option<&str> {
    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", Version::new(1, 2, 3))]
    #[case("v1.2.3", Version::new(1, 2, 3))]
    #[case("  0.10.0\n", Version::new(0, 10, 0))]
    #[case("1.200.30", Version::new(1, 200, 30))]
    fn parse_accepts_plain_versions(#[case] input: &str, #[case] expected: Version) {
        assert_eq!(Version::parse(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("1.2")]
    #[case("1.2.3.4")]
    #[case("1.2.3-rc.1")]
    #[case("vv1.2.3")]
    #[case("latest")]
    #[case("one.two.three")]
    fn parse_rejects_everything_else(#[case] input: &str) {
        assert!(matches!(
            Version::parse(input),
            Err(Error::InvalidVersion(_))
        ));
    }

    #[test]
    fn ordering_is_numeric() {
        let mut versions = vec![
            Version::parse("1.10.0").unwrap(),
            Version::parse("1.9.3").unwrap(),
            Version::parse("0.99.99").unwrap(),
            Version::parse("1.9.10").unwrap(),
        ];
        versions.sort();
        let rendered: Vec<String> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["0.99.99", "1.9.3", "1.9.10", "1.10.0"]);
    }

    #[test]
    fn tag_adds_prefix() {
        assert_eq!(Version::new(1, 4, 0).tag(), "v1.4.0");
    }

    #[test]
    fn spec_parses_latest_case_insensitively() {
        assert_eq!(VersionSpec::parse("latest").unwrap(), VersionSpec::Latest);
        assert_eq!(VersionSpec::parse("LATEST").unwrap(), VersionSpec::Latest);
        assert_eq!(
            VersionSpec::parse("v2.0.1").unwrap(),
            VersionSpec::Exact(Version::new(2, 0, 1))
        );
        assert!(VersionSpec::parse("newest").is_err());
    }

    #[test]
    fn first_version_line_skips_comments() {
        assert_eq!(first_version_line("# pinned\n\n 1.2.3 \n"), Some("1.2.3"));
        assert_eq!(first_version_line("\n  \n"), None);
    }

    #[test]
    fn version_serde_uses_plain_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            version: Version,
        }

        let encoded = toml::to_string(&Wrapper {
            version: Version::new(1, 2, 3),
        })
        .unwrap();
        assert!(encoded.contains("version = \"1.2.3\""));

        let decoded: Wrapper = toml::from_str("version = \"v3.2.1\"").unwrap();
        assert_eq!(decoded.version, Version::new(3, 2, 1));
    }
}
