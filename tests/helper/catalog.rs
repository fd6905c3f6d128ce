//! Catalog and host runtime test doubles

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use npmv::host::HostRuntime;
use npmv::version::error::{HostError, RegistryError};
use npmv::version::registry::ReleaseCatalog;

/// Mock catalog for testing
#[derive(Default)]
pub struct MockCatalog {
    all: Vec<String>,
    pages: HashMap<u32, Vec<String>>,
    calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, versions: Vec<&str>) -> Self {
        self.all = versions.into_iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_page(mut self, page: u32, versions: Vec<&str>) -> Self {
        self.pages
            .insert(page, versions.into_iter().map(|v| v.to_string()).collect());
        self
    }

    /// Number of catalog requests served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseCatalog for MockCatalog {
    async fn list_all_versions(&self) -> Result<Vec<String>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.all.clone())
    }

    async fn list_versions_page(&self, page: u32) -> Result<Vec<String>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}

/// Host runtime reporting a fixed node version and its bundled npm
pub struct FixedHost {
    node: String,
    npm: Option<String>,
}

impl FixedHost {
    pub fn new(node: &str, npm: &str) -> Self {
        Self {
            node: node.to_string(),
            npm: Some(npm.to_string()),
        }
    }

    pub fn without_companion(node: &str) -> Self {
        Self {
            node: node.to_string(),
            npm: None,
        }
    }
}

#[async_trait]
impl HostRuntime for FixedHost {
    async fn current_version(&self) -> Result<String, HostError> {
        Ok(self.node.clone())
    }

    async fn matching_companion_version(
        &self,
        runtime_version: &str,
    ) -> Result<String, HostError> {
        match (&self.npm, runtime_version == self.node) {
            (Some(npm), true) => Ok(npm.clone()),
            _ => Err(HostError::NoCompanion(runtime_version.to_string())),
        }
    }
}
