//! Specifier resolution
//!
//! Turns what a user typed (or what a `.npm-version` file holds) into one
//! concrete version. Two call sites exist with different candidate pools:
//! - install-time resolution consults the remote catalog
//! - local resolution consults the versions already installed

use std::sync::Arc;

use semver::Version;
use tracing::debug;

use crate::config::LATEST_PAGE_LOOKAHEAD;
use crate::host::HostRuntime;
use crate::version::error::{HostError, ResolveError};
use crate::version::installed::InstalledVersions;
use crate::version::range::Range;
use crate::version::registry::ReleaseCatalog;
use crate::version::semver::{clean_version, max_satisfying};

/// Classified form of a version specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    /// Empty, or the literal `latest`
    Latest,
    /// The npm version bundled with the active runtime
    Match,
    /// A complete version, after cleaning
    Exact(Version),
    /// Any npm range expression
    Range(Range),
    /// None of the above
    Invalid,
}

impl Specifier {
    /// Classify by sequential pattern checks: keyword, exact version, range.
    pub fn classify(spec: &str) -> Self {
        let trimmed = spec.trim();
        if trimmed.is_empty() || trimmed == "latest" {
            Specifier::Latest
        } else if trimmed == "match" {
            Specifier::Match
        } else if let Some(version) = clean_version(trimmed) {
            Specifier::Exact(version)
        } else if let Some(range) = Range::parse(trimmed) {
            Specifier::Range(range)
        } else {
            Specifier::Invalid
        }
    }
}

pub struct VersionResolver {
    catalog: Arc<dyn ReleaseCatalog>,
    host: Arc<dyn HostRuntime>,
    installed: Arc<InstalledVersions>,
}

impl VersionResolver {
    pub fn new(
        catalog: Arc<dyn ReleaseCatalog>,
        host: Arc<dyn HostRuntime>,
        installed: Arc<InstalledVersions>,
    ) -> Self {
        Self {
            catalog,
            host,
            installed,
        }
    }

    pub fn installed(&self) -> &Arc<InstalledVersions> {
        &self.installed
    }

    /// Resolve `spec` to a version that can be downloaded.
    ///
    /// Ranges are matched against every version the catalog lists.
    pub async fn resolve_remote(&self, spec: &str) -> Result<String, ResolveError> {
        let resolved = match Specifier::classify(spec) {
            Specifier::Latest => self.latest_published(spec).await?,
            Specifier::Match => self.matching_runtime().await?,
            Specifier::Exact(version) => version.to_string(),
            Specifier::Range(range) => {
                let pool = self.catalog.list_all_versions().await?;
                max_satisfying(&range, &pool)
                    .ok_or_else(|| ResolveError::NoMatch(spec.to_string()))?
            }
            Specifier::Invalid => return Err(ResolveError::SpecInvalid(spec.to_string())),
        };

        debug!("Resolved {:?} to {} (remote)", spec, resolved);
        Ok(resolved)
    }

    /// Resolve `spec` against the versions already installed.
    ///
    /// Returns `Ok(None)` when the specifier is neither a version nor a range,
    /// which tolerates half-written `.npm-version` files. Exact versions are
    /// returned as is, installed or not.
    pub async fn resolve_local(&self, spec: &str) -> Result<Option<String>, ResolveError> {
        let resolved = match Specifier::classify(spec) {
            Specifier::Latest => {
                let pool = self.installed.list().await?;
                pool.last()
                    .cloned()
                    .ok_or_else(|| ResolveError::NoMatch(spec.to_string()))?
            }
            Specifier::Match => self.matching_runtime().await?,
            Specifier::Exact(version) => version.to_string(),
            Specifier::Range(range) => {
                let pool = self.installed.list().await?;
                max_satisfying(&range, &pool)
                    .ok_or_else(|| ResolveError::NoMatch(spec.to_string()))?
            }
            Specifier::Invalid => {
                debug!("Ignoring unparseable specifier {:?}", spec);
                return Ok(None);
            }
        };

        debug!("Resolved {:?} to {} (local)", spec, resolved);
        Ok(Some(resolved))
    }

    /// Newest release of the primary feed.
    ///
    /// A page can consist entirely of non-npm releases, in which case the next
    /// page is consulted.
    async fn latest_published(&self, spec: &str) -> Result<String, ResolveError> {
        for page in 1..=LATEST_PAGE_LOOKAHEAD {
            let versions = self.catalog.list_versions_page(page).await?;
            if let Some(version) = versions.last().and_then(|v| clean_version(v)) {
                return Ok(version.to_string());
            }
            debug!("No release tags on page {}, trying the next one", page);
        }
        Err(ResolveError::NoMatch(spec.to_string()))
    }

    async fn matching_runtime(&self) -> Result<String, ResolveError> {
        let runtime = self.host.current_version().await?;
        let companion = self.host.matching_companion_version(&runtime).await?;
        let version = clean_version(&companion).ok_or(HostError::InvalidVersion(companion))?;
        debug!("node {} ships npm {}", runtime, version);
        Ok(version.to_string())
    }
}
