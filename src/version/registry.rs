//! Catalog trait for listing published npm releases

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;

/// Trait for listing the npm versions available for download
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseCatalog: Send + Sync {
    /// Lists every publishable version across all feeds
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - De-duplicated tag names, ascending by semver
    /// * `Err(RegistryError)` - If any page of any feed fails
    async fn list_all_versions(&self) -> Result<Vec<String>, RegistryError>;

    /// Lists one page of the primary feed, newest releases first on page 1
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Tags shaped `vMAJOR.MINOR.PATCH`, ascending by semver.
    ///   May be empty when the page only holds non-npm releases.
    /// * `Err(RegistryError)` - If the fetch fails
    async fn list_versions_page(&self, page: u32) -> Result<Vec<String>, RegistryError>;
}
