use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::{Release, ReleaseSource};
use crate::checksum::Sha256Digest;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::version::Version;

const DEFAULT_USER_AGENT: &str = concat!("atmosenv/", env!("CARGO_PKG_VERSION"));

/// GitHub releases API client (blocking).
#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    api_root: Url,
    repo: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_url: &str, repo: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Network(format!("Failed to build GitHub client: {err}")))?;
        let api_root = Url::parse(api_url)
            .map_err(|err| Error::Config(format!("Invalid GitHub API URL '{api_url}': {err}")))?;

        Ok(Self {
            http,
            api_root,
            repo: repo.trim().trim_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_url,
            &config.github_repo,
            config.github_token.clone(),
            config.http_timeout(),
        )
    }

    fn endpoint(&self, suffix: &str) -> Url {
        let path = format!(
            "{}/repos/{}/releases{}",
            self.api_root.path().trim_end_matches('/'),
            self.repo,
            suffix
        );
        let mut url = self.api_root.clone();
        url.set_path(&path);
        url
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut request = self.http.get(url).header(USER_AGENT, DEFAULT_USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url, tag: Option<&str>) -> Result<T> {
        tracing::debug!(%url, "requesting release metadata");
        let response = self
            .get(url.as_str())
            .header(ACCEPT, "application/vnd.github+json")
            .send()?;
        let response = handle_errors(response, tag)?;
        response
            .json::<T>()
            .map_err(|err| Error::Network(format!("Failed to decode GitHub response from {url}: {err}")))
    }
}

impl ReleaseSource for GithubClient {
    fn releases_page(&self, page: u32, per_page: u32) -> Result<Vec<Release>> {
        let mut url = self.endpoint("");
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());
        self.get_json(&url, None)
    }

    fn latest_release(&self) -> Result<Release> {
        let url = self.endpoint("/latest");
        self.get_json(&url, None)
    }

    fn release_by_tag(&self, tag: &str) -> Result<Release> {
        let url = self.endpoint(&format!("/tags/{tag}"));
        self.get_json(&url, Some(tag))
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        let response = handle_errors(self.get(url).send()?, None)?;
        response
            .text()
            .map_err(|err| Error::Network(format!("Failed to read {url}: {err}")))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<Sha256Digest> {
        tracing::info!(%url, "downloading release asset");
        let mut response = handle_errors(self.get(url).send()?, None)?;

        let mut file = File::create(dest).map_err(|err| Error::io(dest, err))?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|err| Error::Network(format!("Failed while reading asset stream from {url}: {err}")))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|err| Error::io(dest, err))?;
            hasher.update(&buffer[..read]);
        }

        file.flush().map_err(|err| Error::io(dest, err))?;
        file.sync_all().map_err(|err| Error::io(dest, err))?;
        drop(file);

        if fs::metadata(dest).map_err(|err| Error::io(dest, err))?.len() == 0 {
            return Err(Error::Network(format!("Downloaded asset from {url} was empty")));
        }

        Ok(hasher.finalize().into())
    }
}

fn handle_errors(response: Response, tag: Option<&str>) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if let Some(retry_after) = rate_limit(status, response.headers()) {
        return Err(Error::RateLimited { retry_after });
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(version) = tag.and_then(|tag| Version::parse(tag).ok()) {
            return Err(Error::ReleaseNotFound(version));
        }
    }

    let url = response.url().to_string();
    let body = response
        .text()
        .unwrap_or_else(|_| "<unavailable>".to_string());
    Err(Error::Network(format!("GitHub returned {status} for {url}: {}", body.trim())))
}

/// Detect throttling; `Some(hint)` means the response was a rate limit.
fn rate_limit(status: StatusCode, headers: &HeaderMap) -> Option<Option<Duration>> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };

    let retry_after = header(RETRY_AFTER.as_str()).and_then(|value| value.parse::<u64>().ok());
    let exhausted = header("x-ratelimit-remaining") == Some("0");

    if retry_after.is_none() && !exhausted && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let hint = retry_after.map(Duration::from_secs).or_else(|| {
        let reset = header("x-ratelimit-reset")?.parse::<i64>().ok()?;
        let wait = reset - chrono::Utc::now().timestamp();
        Some(Duration::from_secs(wait.max(0) as u64))
    });

    Some(hint)
}
