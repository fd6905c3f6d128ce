//! Wires catalog, resolver, installer and store together for the commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{GLOBAL_FILE_NAME, INSTALL_DIR_NAME, Settings};
use crate::host::{HostRuntime, NodeRuntime};
use crate::install::{Installer, NativeFs, Remover};
use crate::store::{ActiveVersion, Scope, VersionStore};
use crate::version::error::{InstallError, ResolveError};
use crate::version::installed::InstalledVersions;
use crate::version::registries::GitHubReleases;
use crate::version::registry::ReleaseCatalog;
use crate::version::resolver::{Specifier, VersionResolver};

/// Entry script of the npm CLI inside an installed release
const NPM_CLI_SCRIPT: &str = "bin/npm-cli.js";

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("npm {0} is not installed")]
    NotInstalled(String),

    #[error("No npm version selected; run `npmv use <version>`")]
    NoActiveVersion,

    #[error("{path:?} holds an unusable specifier {specifier:?}")]
    UnusableSpecifier { specifier: String, path: PathBuf },
}

/// The active selection for a directory and the installed version it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentVersion {
    pub active: ActiveVersion,
    pub version: String,
    pub installed: bool,
}

pub struct VersionManager {
    catalog: Arc<dyn ReleaseCatalog>,
    resolver: VersionResolver,
    installer: Installer,
    remover: Remover,
    store: VersionStore,
}

impl VersionManager {
    /// Build the manager for the real world from `settings`
    pub fn new(config_dir: &Path, settings: &Settings) -> Self {
        let installed = Arc::new(InstalledVersions::new(config_dir.join(INSTALL_DIR_NAME)));
        let catalog: Arc<dyn ReleaseCatalog> = Arc::new(GitHubReleases::new(
            &settings.github_api_url,
            settings.feeds.clone(),
        ));
        let host: Arc<dyn HostRuntime> = Arc::new(NodeRuntime::new(&settings.dist_index_url));

        let mut installer = Installer::new(
            &settings.download_url,
            settings.primary_feed(),
            installed.clone(),
        );
        if settings.repair_symlinks {
            installer = installer.with_symlink_repair(Arc::new(NativeFs));
        }

        Self::build(
            catalog,
            host,
            installed,
            installer,
            VersionStore::new(config_dir.join(GLOBAL_FILE_NAME)),
        )
    }

    /// Build a manager from custom components
    pub fn build(
        catalog: Arc<dyn ReleaseCatalog>,
        host: Arc<dyn HostRuntime>,
        installed: Arc<InstalledVersions>,
        installer: Installer,
        store: VersionStore,
    ) -> Self {
        Self {
            resolver: VersionResolver::new(catalog.clone(), host, installed.clone()),
            remover: Remover::new(installed),
            catalog,
            installer,
            store,
        }
    }

    fn installed(&self) -> &Arc<InstalledVersions> {
        self.resolver.installed()
    }

    /// Resolve `spec` against the catalog and install the result
    pub async fn install(&self, spec: &str) -> Result<String, ManagerError> {
        let version = self.resolver.resolve_remote(spec).await?;
        Ok(self.installer.install(&version).await?)
    }

    /// Remove the installed version `spec` designates
    pub async fn uninstall(&self, spec: &str) -> Result<String, ManagerError> {
        let version = match Specifier::classify(spec) {
            Specifier::Exact(version) => version.to_string(),
            _ => self
                .resolver
                .resolve_local(spec)
                .await?
                .ok_or_else(|| InstallError::InvalidVersion(spec.to_string()))?,
        };
        Ok(self.remover.remove(&version).await?)
    }

    /// Install what `spec` designates and record `spec` itself as the selection
    pub async fn use_version(
        &self,
        spec: &str,
        scope: Scope,
        dir: &Path,
    ) -> Result<String, ManagerError> {
        let version = self.install(spec).await?;
        match scope {
            Scope::Global => self.store.set_global(spec).await?,
            Scope::Local => {
                self.store.set_local(dir, spec).await?;
            }
        }
        info!("Using npm {} ({:?} selection {:?})", version, scope, spec);
        Ok(version)
    }

    /// The selection in effect for `dir`, resolved among installed versions
    pub async fn current(&self, dir: &Path) -> Result<CurrentVersion, ManagerError> {
        let active = self
            .store
            .get_active(dir)
            .await?
            .ok_or(ManagerError::NoActiveVersion)?;

        let version = self
            .resolver
            .resolve_local(&active.specifier)
            .await?
            .ok_or_else(|| ManagerError::UnusableSpecifier {
                specifier: active.specifier.clone(),
                path: active.path.clone(),
            })?;
        let installed = self.installed().contains(&version).await?;
        debug!("{:?} resolves to {} (installed: {})", active.path, version, installed);

        Ok(CurrentVersion {
            active,
            version,
            installed,
        })
    }

    /// Path of the npm CLI script for `spec`, or for the selection in effect
    pub async fn which(&self, spec: Option<&str>, dir: &Path) -> Result<PathBuf, ManagerError> {
        let version = match spec {
            Some(spec) => self
                .resolver
                .resolve_local(spec)
                .await?
                .ok_or_else(|| ResolveError::SpecInvalid(spec.to_string()))?,
            None => self.current(dir).await?.version,
        };

        if !self.installed().contains(&version).await? {
            return Err(ManagerError::NotInstalled(version));
        }
        Ok(self.installed().version_dir(&version).join(NPM_CLI_SCRIPT))
    }

    /// Installed versions, ascending
    pub async fn list_installed(&self) -> Result<Vec<String>, ManagerError> {
        Ok(self.installed().list().await?)
    }

    /// Every version the catalog offers, ascending
    pub async fn list_remote(&self) -> Result<Vec<String>, ManagerError> {
        let versions = self
            .catalog
            .list_all_versions()
            .await
            .map_err(ResolveError::from)?;
        Ok(versions)
    }
}
