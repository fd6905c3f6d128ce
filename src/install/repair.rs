//! Post-install symlink repair
//!
//! npm 7 and later ship workspace packages as symlinks under `node_modules`.
//! Where those links do not resolve (Windows without symlink privileges), each
//! link is replaced by a directory junction, or, when junctions are not
//! available, by the directory it pointed to.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, try_join_all};
#[cfg(test)]
use mockall::automock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Symlink,
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Filesystem primitives the repair walk needs
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait LinkFs: Send + Sync {
    /// Entries of `dir`, classified without following links
    async fn read_dir(&self, dir: &Path) -> io::Result<Vec<Entry>>;

    async fn read_link(&self, link: &Path) -> io::Result<PathBuf>;

    async fn remove_link(&self, link: &Path) -> io::Result<()>;

    /// Create a symbolic link at `link`; a relative `target` is kept relative
    async fn create_symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Create a directory junction at `link` pointing to `target`.
    ///
    /// Fails with `ErrorKind::Unsupported` where the platform has no such thing.
    async fn create_junction(&self, target: &Path, link: &Path) -> io::Result<()>;

    async fn move_dir(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `LinkFs` over the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFs;

#[async_trait::async_trait]
impl LinkFs for NativeFs {
    async fn read_dir(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut result = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            result.push(Entry::new(entry.path(), kind));
        }
        Ok(result)
    }

    async fn read_link(&self, link: &Path) -> io::Result<PathBuf> {
        tokio::fs::read_link(link).await
    }

    async fn remove_link(&self, link: &Path) -> io::Result<()> {
        #[cfg(windows)]
        {
            // Directory symlinks are removed as directories on Windows
            if tokio::fs::remove_dir(link).await.is_ok() {
                return Ok(());
            }
        }
        tokio::fs::remove_file(link).await
    }

    async fn create_symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            tokio::fs::symlink(target, link).await
        }
        #[cfg(windows)]
        {
            let resolved = match link.parent() {
                Some(parent) => parent.join(target),
                None => target.to_path_buf(),
            };
            if tokio::fs::metadata(&resolved).await.is_ok_and(|m| m.is_dir()) {
                tokio::fs::symlink_dir(target, link).await
            } else {
                tokio::fs::symlink_file(target, link).await
            }
        }
        #[cfg(not(any(windows, unix)))]
        {
            let _ = (target, link);
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }
    }

    async fn create_junction(&self, target: &Path, link: &Path) -> io::Result<()> {
        #[cfg(windows)]
        {
            // Junctions need no privilege, unlike directory symlinks
            let (target, link) = (target.to_path_buf(), link.to_path_buf());
            tokio::task::spawn_blocking(move || junction::create(&target, &link))
                .await
                .map_err(io::Error::other)?
        }
        #[cfg(unix)]
        {
            tokio::fs::symlink(target, link).await
        }
        #[cfg(not(any(windows, unix)))]
        {
            let _ = (target, link);
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }
    }

    async fn move_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }
}

/// Whether a link or junction failure means "not available here" rather than a
/// real fault
pub(crate) fn link_unsupported(err: &io::Error) -> bool {
    // ERROR_PRIVILEGE_NOT_HELD
    const PRIVILEGE_NOT_HELD: i32 = 1314;

    matches!(
        err.kind(),
        io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied
    ) || (cfg!(windows) && err.raw_os_error() == Some(PRIVILEGE_NOT_HELD))
}

pub struct SymlinkRepair {
    fs: Arc<dyn LinkFs>,
}

impl SymlinkRepair {
    pub fn new(fs: Arc<dyn LinkFs>) -> Self {
        Self { fs }
    }

    /// Replace every symlink under `dir`, returning how many were replaced.
    ///
    /// Sibling directories are walked concurrently.
    pub async fn repair(&self, dir: &Path) -> io::Result<usize> {
        let repaired = self.walk(dir).await?;
        debug!("Repaired {} links under {:?}", repaired, dir);
        Ok(repaired)
    }

    fn walk<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, io::Result<usize>> {
        async move {
            let mut repaired = 0;
            let mut subdirs = Vec::new();

            for entry in self.fs.read_dir(dir).await? {
                match entry.kind {
                    EntryKind::Symlink => {
                        self.replace_link(&entry.path).await?;
                        repaired += 1;
                    }
                    EntryKind::Directory => subdirs.push(entry.path),
                    EntryKind::File => {}
                }
            }

            let nested = try_join_all(subdirs.iter().map(|subdir| self.walk(subdir))).await?;
            Ok(repaired + nested.into_iter().sum::<usize>())
        }
        .boxed()
    }

    async fn replace_link(&self, link: &Path) -> io::Result<()> {
        let target = self.fs.read_link(link).await?;
        let target = match link.parent() {
            Some(parent) if target.is_relative() => parent.join(target),
            _ => target,
        };

        self.fs.remove_link(link).await?;
        self.place(&target, link).await
    }

    /// Make the directory `target` reachable at `link`: a junction where
    /// possible, otherwise the directory itself is moved there.
    pub async fn place(&self, target: &Path, link: &Path) -> io::Result<()> {
        match self.fs.create_junction(target, link).await {
            Ok(()) => {
                debug!("Junction {:?} -> {:?}", link, target);
                Ok(())
            }
            Err(e) if link_unsupported(&e) => {
                debug!("Junctions unavailable ({}), moving {:?} to {:?}", e, target, link);
                self.fs.move_dir(target, link).await
            }
            Err(e) => Err(e),
        }
    }
}
