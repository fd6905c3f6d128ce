//! GitHub Releases API catalog implementation

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{Feed, RELEASES_PER_PAGE};
use crate::version::error::RegistryError;
use crate::version::registry::ReleaseCatalog;
use crate::version::semver::clean_version;

/// Tags of downloadable npm releases look exactly like `v8.1.0`
static RELEASE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+\.\d+\.\d+$").expect("valid release tag pattern"));

/// Response item from GitHub Releases API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
}

impl Release {
    /// The feeds mix npm releases with releases of unrelated libraries; only
    /// names carrying the `:` separator belong to the candidate pool.
    fn is_candidate(&self) -> bool {
        self.name.as_deref().is_some_and(|name| name.contains(':'))
    }
}

/// Catalog backed by the GitHub releases of one or more repositories
pub struct GitHubReleases {
    client: reqwest::Client,
    base_url: String,
    feeds: Vec<Feed>,
    per_page: u32,
}

impl GitHubReleases {
    /// Creates a new catalog over `feeds`; the first feed is the primary one
    pub fn new(base_url: &str, feeds: Vec<Feed>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("npmv")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            feeds,
            per_page: RELEASES_PER_PAGE,
        }
    }

    /// Overrides the page size sent as `per_page`
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    fn primary_feed(&self) -> Result<&Feed, RegistryError> {
        self.feeds
            .first()
            .ok_or_else(|| RegistryError::InvalidResponse("no release feed configured".into()))
    }

    async fn fetch_page(&self, feed: &Feed, page: u32) -> Result<Vec<Release>, RegistryError> {
        let url = format!(
            "{}/repos/{}/{}/releases?per_page={}&page={}",
            self.base_url, feed.owner, feed.repo, self.per_page, page
        );
        debug!("Listing releases of {}/{} page {}", feed.owner, feed.repo, page);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(format!("{}/{}", feed.owner, feed.repo)));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub releases response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }
}

#[async_trait::async_trait]
impl ReleaseCatalog for GitHubReleases {
    async fn list_all_versions(&self) -> Result<Vec<String>, RegistryError> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();

        for feed in &self.feeds {
            let mut page = 1;
            loop {
                let releases = self.fetch_page(feed, page).await?;
                if releases.is_empty() {
                    break;
                }
                for release in releases.into_iter().filter(Release::is_candidate) {
                    if clean_version(&release.tag_name).is_some()
                        && seen.insert(release.tag_name.clone())
                    {
                        tags.push(release.tag_name);
                    }
                }
                page += 1;
            }
        }

        tags.sort_by_cached_key(|tag| clean_version(tag));
        debug!("Catalog lists {} versions", tags.len());
        Ok(tags)
    }

    async fn list_versions_page(&self, page: u32) -> Result<Vec<String>, RegistryError> {
        let feed = self.primary_feed()?;
        let mut tags: Vec<String> = self
            .fetch_page(feed, page)
            .await?
            .into_iter()
            .map(|r| r.tag_name)
            .filter(|tag| RELEASE_TAG.is_match(tag))
            .collect();

        tags.sort_by_cached_key(|tag| clean_version(tag));
        Ok(tags)
    }
}
