//! Node.js, the runtime npm is a companion of

#[cfg(test)]
use mockall::automock;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::DEFAULT_DIST_INDEX_URL;
use crate::version::error::{HostError, RegistryError};
use crate::version::semver::clean_version;

/// Answers "which runtime is active" and "which npm belongs to it"
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait HostRuntime: Send + Sync {
    /// Version of the runtime currently on PATH, without a `v` prefix
    async fn current_version(&self) -> Result<String, HostError>;

    /// npm version bundled with the given runtime version
    async fn matching_companion_version(&self, runtime_version: &str)
    -> Result<String, HostError>;
}

/// Entry of the Node.js distribution index
#[derive(Debug, Deserialize)]
struct DistRelease {
    version: String,
    #[serde(default)]
    npm: Option<String>,
}

/// Queries the local `node` binary and the Node.js distribution index
pub struct NodeRuntime {
    client: reqwest::Client,
    node_binary: String,
    dist_index_url: String,
}

impl NodeRuntime {
    pub fn new(dist_index_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("npmv")
                .build()
                .expect("Failed to create HTTP client"),
            node_binary: "node".to_string(),
            dist_index_url: dist_index_url.to_string(),
        }
    }

    /// Use a specific runtime binary instead of `node` from PATH
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.node_binary = binary.into();
        self
    }

    async fn fetch_index(&self) -> Result<Vec<DistRelease>, RegistryError> {
        let response = self.client.get(&self.dist_index_url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(self.dist_index_url.clone()));
        }

        if !status.is_success() {
            warn!("Distribution index returned status {}", status);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))
    }
}

impl Default for NodeRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_DIST_INDEX_URL)
    }
}

#[async_trait::async_trait]
impl HostRuntime for NodeRuntime {
    async fn current_version(&self) -> Result<String, HostError> {
        let command = format!("{} --version", self.node_binary);
        let output = Command::new(&self.node_binary)
            .arg("--version")
            .output()
            .await
            .map_err(|source| HostError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HostError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = clean_version(&stdout)
            .ok_or_else(|| HostError::InvalidVersion(stdout.trim().to_string()))?;
        debug!("Active node is {}", version);
        Ok(version.to_string())
    }

    async fn matching_companion_version(
        &self,
        runtime_version: &str,
    ) -> Result<String, HostError> {
        let wanted = clean_version(runtime_version)
            .ok_or_else(|| HostError::InvalidVersion(runtime_version.to_string()))?;

        self.fetch_index()
            .await?
            .into_iter()
            .find(|release| clean_version(&release.version).as_ref() == Some(&wanted))
            .and_then(|release| release.npm)
            .ok_or_else(|| HostError::NoCompanion(wanted.to_string()))
    }
}
