use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Unrecognized runtime version: {0:?}")]
    InvalidVersion(String),

    #[error("No npm version is known for node {0}")]
    NoCompanion(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No version matching {0:?}")]
    NoMatch(String),

    #[error("Invalid version specifier: {0:?}")]
    SpecInvalid(String),

    #[error(transparent)]
    Upstream(#[from] RegistryError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Invalid version: {0:?}")]
    InvalidVersion(String),

    #[error("Download failed: {0}")]
    DownloadFailed(#[source] RegistryError),

    #[error("Failed to extract into {path:?}: {source}")]
    ExtractFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to repair links under {path:?}: {source}")]
    Repair {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
