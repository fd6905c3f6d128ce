//! Download and unpack npm releases into the install repository

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

use crate::config::{Feed, SYMLINK_REPAIR_THRESHOLD};
use crate::install::repair::{LinkFs, NativeFs, SymlinkRepair, link_unsupported};
use crate::version::error::{InstallError, RegistryError};
use crate::version::installed::InstalledVersions;
use crate::version::semver::clean_version;

/// Subdirectory of an extracted release holding its bundled dependencies
const DEPENDENCY_DIR: &str = "node_modules";

pub struct Installer {
    client: reqwest::Client,
    download_url: String,
    feed: Feed,
    installed: Arc<InstalledVersions>,
    fs: Arc<dyn LinkFs>,
    repair: Option<SymlinkRepair>,
}

/// Symbolic link entry held back until every regular entry is on disk
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeferredLink {
    /// Location of the link, relative to the install directory
    path: PathBuf,
    /// Target as recorded in the archive
    target: PathBuf,
}

impl Installer {
    pub fn new(download_url: &str, feed: Feed, installed: Arc<InstalledVersions>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("npmv")
                .build()
                .expect("Failed to create HTTP client"),
            download_url: download_url.trim_end_matches('/').to_string(),
            feed,
            installed,
            fs: Arc::new(NativeFs),
            repair: None,
        }
    }

    /// Rewrite symlinks of releases that ship workspaces as links, and fall
    /// back to junctions when the archive's own links cannot be created
    pub fn with_symlink_repair(mut self, fs: Arc<dyn LinkFs>) -> Self {
        self.fs = fs.clone();
        self.repair = Some(SymlinkRepair::new(fs));
        self
    }

    /// Tarball URL for a version, e.g. `<base>/npm/cli/tar.gz/v8.1.0`
    pub fn archive_url(&self, version: &str) -> String {
        format!(
            "{}/{}/{}/tar.gz/v{}",
            self.download_url,
            self.feed.owner,
            self.feed.repo,
            version.trim_start_matches('v')
        )
    }

    /// Install an exact version.
    ///
    /// An existing install directory counts as installed: nothing is
    /// downloaded and nothing is verified. A failed download or extraction
    /// leaves the partially filled directory behind.
    pub async fn install(&self, spec: &str) -> Result<String, InstallError> {
        let version =
            clean_version(spec).ok_or_else(|| InstallError::InvalidVersion(spec.to_string()))?;
        let name = version.to_string();
        let target = self.installed.version_dir(&name);

        if tokio::fs::try_exists(&target).await? {
            debug!("npm {} already installed at {:?}", name, target);
            return Ok(name);
        }

        tokio::fs::create_dir_all(&target).await?;
        self.installed.invalidate().await;

        let url = self.archive_url(&name);
        info!("Downloading npm {} from {}", name, url);
        let archive = self
            .download(&url)
            .await
            .map_err(InstallError::DownloadFailed)?;

        let dest = target.clone();
        let links = tokio::task::spawn_blocking(move || unpack_stripped(&archive, &dest))
            .await
            .map_err(io::Error::other)?
            .map_err(|source| InstallError::ExtractFailed {
                path: target.clone(),
                source,
            })?;
        self.create_links(&target, links)
            .await
            .map_err(|source| InstallError::ExtractFailed {
                path: target.clone(),
                source,
            })?;

        if version >= SYMLINK_REPAIR_THRESHOLD
            && let Some(repair) = &self.repair
        {
            let dependencies = target.join(DEPENDENCY_DIR);
            if tokio::fs::try_exists(&dependencies).await? {
                let repaired = repair
                    .repair(&dependencies)
                    .await
                    .map_err(|source| InstallError::Repair {
                        path: dependencies.clone(),
                        source,
                    })?;
                info!("Repaired {} links in npm {}", repaired, name);
            }
        }

        info!("Installed npm {} into {:?}", name, target);
        Ok(name)
    }

    /// Create the archive's links once their targets exist.
    ///
    /// Where links cannot be created and repair is enabled, the target
    /// directory is made reachable through a junction or moved in place.
    async fn create_links(&self, dest: &Path, links: Vec<DeferredLink>) -> io::Result<()> {
        for link in links {
            let path = dest.join(&link.path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            match self.fs.create_symlink(&link.target, &path).await {
                Ok(()) => debug!("Linked {:?} -> {:?}", path, link.target),
                Err(e) if link_unsupported(&e) => {
                    let Some(repair) = &self.repair else {
                        return Err(e);
                    };
                    let target = resolve_within(&link.path, &link.target)
                        .map(|relative| dest.join(relative))
                        .ok_or_else(|| escapes(&link.path))?;
                    debug!("Cannot link {:?} ({}), placing {:?} instead", path, e, target);
                    repair.place(&target, &path).await?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, RegistryError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            warn!("Download returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Unpack a gzipped tarball into `dest`, dropping the top-level folder every
/// entry is wrapped in.
///
/// Symbolic links are not created here but returned, so that nothing is ever
/// written through a link. Links must point inside the release.
fn unpack_stripped(archive: &[u8], dest: &Path) -> io::Result<Vec<DeferredLink>> {
    let root = dest.canonicalize()?;
    let mut archive = Archive::new(GzDecoder::new(archive));
    let mut links = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::XGlobalHeader | EntryType::XHeader) {
            continue;
        }

        let path = entry.path()?.into_owned();
        let Some(relative) = strip_first_component(&path) else {
            continue;
        };

        match entry_type {
            EntryType::Symlink => {
                let target = entry
                    .link_name()?
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("link {:?} has no target", path),
                        )
                    })?
                    .into_owned();
                if resolve_within(&relative, &target).is_none() {
                    return Err(escapes(&path));
                }
                links.push(DeferredLink {
                    path: relative,
                    target,
                });
                continue;
            }
            EntryType::Link => {
                warn!("Skipping hard link {:?}", path);
                continue;
            }
            _ => {}
        }

        let out = dest.join(relative);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
            if !parent.canonicalize()?.starts_with(&root) {
                return Err(escapes(&path));
            }
        }
        entry.unpack(&out)?;
    }

    Ok(links)
}

fn escapes(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{:?} points outside the install directory", path),
    )
}

/// `package/bin/npm` -> `bin/npm`. `None` for the wrapper itself and for
/// paths that are absolute or climb with `..`.
fn strip_first_component(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    let rest: PathBuf = components.collect();

    let is_safe = rest.components().all(|c| matches!(c, Component::Normal(_)));
    (is_safe && !rest.as_os_str().is_empty()).then_some(rest)
}

/// Where the link at `link` (relative to the release) lands when followed,
/// as a path relative to the release. `None` when it leaves the release.
fn resolve_within(link: &Path, target: &Path) -> Option<PathBuf> {
    let mut resolved: Vec<Component> = link.parent()?.components().collect();
    for component in target.components() {
        match component {
            Component::Normal(_) => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved.into_iter().collect())
}
