//! Versions present in the local install repository

use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::version::semver::{clean_version, sort_versions};

/// Memoized listing of the install repository.
///
/// The first `list` reads the repository; later calls are served from memory
/// until `invalidate` is called. `Installer` and `Remover` invalidate after
/// every change they make, so staleness is limited to changes made by other
/// processes.
pub struct InstalledVersions {
    root: PathBuf,
    cache: Mutex<Option<Vec<String>>>,
}

impl InstalledVersions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(None),
        }
    }

    /// Directory a given version is (or would be) installed into
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    /// Installed versions, ascending by semver. A missing repository is empty.
    pub async fn list(&self) -> io::Result<Vec<String>> {
        let mut cache = self.cache.lock().await;
        if let Some(versions) = cache.as_ref() {
            return Ok(versions.clone());
        }

        let versions = read_repository(&self.root).await?;
        debug!("Found {} installed versions in {:?}", versions.len(), self.root);
        *cache = Some(versions.clone());
        Ok(versions)
    }

    /// Whether `version` has an install directory
    pub async fn contains(&self, version: &str) -> io::Result<bool> {
        tokio::fs::try_exists(self.version_dir(version)).await
    }

    /// Drop the memoized listing so the next `list` re-reads the repository
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

async fn read_repository(root: &Path) -> io::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        // Directory names must be the exact version string, not merely parse as one
        if clean_version(&name).is_some_and(|v| v.to_string() == name)
            && entry.file_type().await?.is_dir()
        {
            names.push(name);
        }
    }

    Ok(sort_versions(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repository(entries: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for entry in entries {
            std::fs::create_dir(dir.path().join(entry)).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn list_returns_semver_order_and_skips_stray_entries() {
        let dir = repository(&["10.0.0", "6.14.4", "v7.0.0", "8.1.0", "tmp"]);
        std::fs::write(dir.path().join("README"), "stray").unwrap();

        let installed = InstalledVersions::new(dir.path());

        assert_eq!(
            installed.list().await.unwrap(),
            vec!["6.14.4", "8.1.0", "10.0.0"]
        );
    }

    #[tokio::test]
    async fn list_is_empty_when_repository_is_missing() {
        let dir = TempDir::new().unwrap();
        let installed = InstalledVersions::new(dir.path().join("npmv"));

        assert!(installed.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_memoized_until_invalidated() {
        let dir = repository(&["8.1.0"]);
        let installed = InstalledVersions::new(dir.path());
        assert_eq!(installed.list().await.unwrap(), vec!["8.1.0"]);

        std::fs::create_dir(dir.path().join("9.0.0")).unwrap();
        assert_eq!(installed.list().await.unwrap(), vec!["8.1.0"]);

        installed.invalidate().await;
        assert_eq!(installed.list().await.unwrap(), vec!["8.1.0", "9.0.0"]);
    }

    #[tokio::test]
    async fn contains_checks_the_version_directory() {
        let dir = repository(&["8.1.0"]);
        let installed = InstalledVersions::new(dir.path());

        assert!(installed.contains("8.1.0").await.unwrap());
        assert!(!installed.contains("8.2.0").await.unwrap());
    }
}
