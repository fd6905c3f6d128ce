//! Persisted "active version" selections
//!
//! The global selection lives in one file in the config directory. Local
//! selections live in `.npm-version` files; the nearest one found walking up
//! from the working directory wins and shadows the global one.
//!
//! Both files hold the raw specifier, unresolved.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{LOCAL_FILE_NAME, MAX_LOCAL_SEARCH_DEPTH};

/// A specifier read from disk together with the file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVersion {
    pub specifier: String,
    pub path: PathBuf,
    pub scope: Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
}

pub struct VersionStore {
    global_path: PathBuf,
    ceiling: Option<PathBuf>,
}

impl VersionStore {
    pub fn new(global_path: impl Into<PathBuf>) -> Self {
        Self {
            global_path: global_path.into(),
            ceiling: None,
        }
    }

    /// Stop the upward search for local files at `dir`, after searching it
    pub fn with_search_ceiling(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ceiling = Some(dir.into());
        self
    }

    pub fn global_path(&self) -> &Path {
        &self.global_path
    }

    /// Overwrite the global selection, creating the config directory if needed
    pub async fn set_global(&self, spec: &str) -> io::Result<()> {
        if let Some(parent) = self.global_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.global_path, spec).await?;
        debug!("Global version set to {:?}", spec);
        Ok(())
    }

    /// Read the global selection. A missing file is an error.
    pub async fn get_global(&self) -> io::Result<String> {
        let contents = tokio::fs::read_to_string(&self.global_path).await?;
        Ok(contents.trim().to_string())
    }

    /// Write the local selection into `dir` itself, never an ancestor
    pub async fn set_local(&self, dir: &Path, spec: &str) -> io::Result<PathBuf> {
        let path = dir.join(LOCAL_FILE_NAME);
        tokio::fs::write(&path, spec).await?;
        debug!("Local version in {:?} set to {:?}", dir, spec);
        Ok(path)
    }

    /// Find the nearest local selection, starting at `dir` and walking up.
    ///
    /// Returns `Ok(None)` when no ancestor has a `.npm-version` file.
    pub async fn get_local(&self, dir: &Path) -> io::Result<Option<ActiveVersion>> {
        let mut visited = HashSet::new();

        for candidate in dir.ancestors().take(MAX_LOCAL_SEARCH_DEPTH) {
            let at_ceiling = self.ceiling.as_deref() == Some(candidate);

            // Symlinked directories can lead back to a level already searched
            let canonical = tokio::fs::canonicalize(candidate)
                .await
                .unwrap_or_else(|_| candidate.to_path_buf());
            if !visited.insert(canonical) {
                debug!("{:?} was already searched, skipping", candidate);
                if at_ceiling {
                    break;
                }
                continue;
            }

            let path = candidate.join(LOCAL_FILE_NAME);
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    debug!("Found local version file {:?}", path);
                    return Ok(Some(ActiveVersion {
                        specifier: contents.trim().to_string(),
                        path,
                        scope: Scope::Local,
                    }));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                // A directory named `.npm-version` is not a selection
                Err(e) if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) => {
                    debug!("Skipping {:?}: {}", path, e);
                }
                Err(e) => return Err(e),
            }

            if at_ceiling {
                debug!("Reached search ceiling {:?}", candidate);
                break;
            }
        }

        Ok(None)
    }

    /// The selection in effect for `dir`: local if any, otherwise global.
    ///
    /// Returns `Ok(None)` only when neither exists.
    pub async fn get_active(&self, dir: &Path) -> io::Result<Option<ActiveVersion>> {
        if let Some(local) = self.get_local(dir).await? {
            return Ok(Some(local));
        }

        match self.get_global().await {
            Ok(specifier) => Ok(Some(ActiveVersion {
                specifier,
                path: self.global_path.clone(),
                scope: Scope::Global,
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
