//! Remove installed npm releases

use std::sync::Arc;

use tracing::{debug, info};

use crate::version::error::InstallError;
use crate::version::installed::InstalledVersions;
use crate::version::semver::clean_version;

pub struct Remover {
    installed: Arc<InstalledVersions>,
}

impl Remover {
    pub fn new(installed: Arc<InstalledVersions>) -> Self {
        Self { installed }
    }

    /// Delete the install directory of an exact version.
    ///
    /// Removing a version that is not installed succeeds.
    pub async fn remove(&self, spec: &str) -> Result<String, InstallError> {
        let version =
            clean_version(spec).ok_or_else(|| InstallError::InvalidVersion(spec.to_string()))?;
        let name = version.to_string();
        let target = self.installed.version_dir(&name);

        if !tokio::fs::try_exists(&target).await? {
            debug!("npm {} is not installed, nothing to remove", name);
            return Ok(name);
        }

        tokio::fs::remove_dir_all(&target).await?;
        self.installed.invalidate().await;
        info!("Removed npm {} from {:?}", name, target);
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn remover(root: &TempDir) -> (Arc<InstalledVersions>, Remover) {
        let installed = Arc::new(InstalledVersions::new(root.path()));
        (installed.clone(), Remover::new(installed))
    }

    #[tokio::test]
    async fn remove_deletes_version_tree() {
        let root = TempDir::new().unwrap();
        let bin = root.path().join("8.1.0").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("npm-cli.js"), "// npm").unwrap();
        let (installed, remover) = remover(&root);
        assert_eq!(installed.list().await.unwrap(), vec!["8.1.0"]);

        let result = remover.remove("v8.1.0").await.unwrap();

        assert_eq!(result, "8.1.0");
        assert!(!root.path().join("8.1.0").exists());
        assert!(installed.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_of_absent_version_succeeds() {
        let root = TempDir::new().unwrap();
        let (_, remover) = remover(&root);

        assert_eq!(remover.remove("6.14.4").await.unwrap(), "6.14.4");
        assert_eq!(remover.remove("6.14.4").await.unwrap(), "6.14.4");
    }

    #[tokio::test]
    async fn remove_rejects_invalid_version() {
        let root = TempDir::new().unwrap();
        let (_, remover) = remover(&root);

        let result = remover.remove("latest").await;

        assert!(matches!(result, Err(InstallError::InvalidVersion(spec)) if spec == "latest"));
    }

    #[tokio::test]
    async fn remove_leaves_other_versions_alone() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("6.14.4")).unwrap();
        std::fs::create_dir_all(root.path().join("8.1.0")).unwrap();
        let (_, remover) = remover(&root);

        remover.remove("8.1.0").await.unwrap();

        assert!(root.path().join("6.14.4").is_dir());
    }
}
