use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Persisted layout
// =============================================================================

/// File holding the global active-version specifier, inside the config directory
pub const GLOBAL_FILE_NAME: &str = ".npm-version-global";

/// File holding a per-directory active-version specifier
pub const LOCAL_FILE_NAME: &str = ".npm-version";

/// Directory under the config directory holding one subdirectory per installed version
pub const INSTALL_DIR_NAME: &str = "npmv";

/// Optional settings file inside the config directory
pub const SETTINGS_FILE_NAME: &str = "npmv.json";

// =============================================================================
// Upstream
// =============================================================================

/// Default base URL for GitHub API
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default base URL for release tarballs
pub const DEFAULT_DOWNLOAD_URL: &str = "https://codeload.github.com";

/// Node.js distribution index, maps each runtime release to its bundled npm
pub const DEFAULT_DIST_INDEX_URL: &str = "https://nodejs.org/dist/index.json";

/// Releases requested per page from the GitHub API
pub const RELEASES_PER_PAGE: u32 = 100;

/// Pages inspected when looking up "latest" before giving up
pub const LATEST_PAGE_LOOKAHEAD: u32 = 3;

// =============================================================================
// Install and lookup limits
// =============================================================================

/// First npm release laying out workspaces as symlinks under node_modules
pub const SYMLINK_REPAIR_THRESHOLD: semver::Version = semver::Version::new(7, 0, 0);

/// Upper bound on ancestors visited while searching for a local version file
pub const MAX_LOCAL_SEARCH_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// User settings, read from `<configDir>/npmv.json`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub github_api_url: String,
    pub download_url: String,
    pub dist_index_url: String,
    /// Release feeds merged into the candidate pool; the first is the primary one
    pub feeds: Vec<Feed>,
    /// Rewrite symlinks after extraction. Defaults to on for Windows only.
    pub repair_symlinks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            dist_index_url: DEFAULT_DIST_INDEX_URL.to_string(),
            feeds: vec![Feed::new("npm", "cli"), Feed::new("npm", "npm")],
            repair_symlinks: cfg!(windows),
        }
    }
}

impl Settings {
    /// Load settings from `dir`, falling back to defaults when the file is absent
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let path = dir.join(SETTINGS_FILE_NAME);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| SettingsError::Parse { path, source })
    }

    /// The feed whose releases are the downloadable npm versions
    pub fn primary_feed(&self) -> Feed {
        self.feeds
            .first()
            .cloned()
            .unwrap_or_else(|| Feed::new("npm", "cli"))
    }
}

/// A GitHub repository publishing npm releases
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
pub struct Feed {
    pub owner: String,
    pub repo: String,
}

impl Feed {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }
}

/// Returns the configuration directory for npmv.
/// Uses $NPMV_CONFIG_DIR if set, otherwise the platform config directory,
/// or `.` if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("NPMV_CONFIG_DIR").ok(), dirs::config_dir())
}

fn config_dir_with_env(override_dir: Option<String>, platform_dir: Option<PathBuf>) -> PathBuf {
    override_dir
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or(platform_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn settings_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<Settings>(json!({
            "githubApiUrl": "http://localhost:8080"
        }))
        .unwrap();

        assert_eq!(result.github_api_url, "http://localhost:8080");
        assert_eq!(result.download_url, DEFAULT_DOWNLOAD_URL);
        assert_eq!(result.feeds, Settings::default().feeds);
    }

    #[test]
    fn settings_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<Settings>(json!({
            "githubApiUrl": "http://api",
            "downloadUrl": "http://download",
            "distIndexUrl": "http://dist/index.json",
            "feeds": [{ "owner": "me", "repo": "npm-fork" }],
            "repairSymlinks": true
        }))
        .unwrap();

        assert_eq!(
            result,
            Settings {
                github_api_url: "http://api".to_string(),
                download_url: "http://download".to_string(),
                dist_index_url: "http://dist/index.json".to_string(),
                feeds: vec![Feed::new("me", "npm-fork")],
                repair_symlinks: true,
            }
        );
    }

    #[test]
    fn load_returns_defaults_when_file_is_missing() {
        let dir = TempDir::new().unwrap();

        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE_NAME), "{ not json").unwrap();

        assert!(matches!(
            Settings::load(dir.path()),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn primary_feed_falls_back_when_feeds_are_empty() {
        let settings = Settings {
            feeds: vec![],
            ..Settings::default()
        };

        assert_eq!(settings.primary_feed(), Feed::new("npm", "cli"));
    }

    #[test]
    fn config_dir_with_env_uses_override_when_set() {
        let path = config_dir_with_env(
            Some("/tmp/npmv-test".to_string()),
            Some(PathBuf::from("/home/user/.config")),
        );

        assert_eq!(path, PathBuf::from("/tmp/npmv-test"));
    }

    #[test]
    fn config_dir_with_env_ignores_empty_override() {
        let path = config_dir_with_env(Some(String::new()), Some(PathBuf::from("/home/user/.config")));

        assert_eq!(path, PathBuf::from("/home/user/.config"));
    }

    #[test]
    fn config_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = config_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("."));
    }

    #[test]
    #[serial]
    fn config_dir_reads_override_from_environment() {
        let dir = TempDir::new().unwrap();
        unsafe { std::env::set_var("NPMV_CONFIG_DIR", dir.path()) };

        let resolved = config_dir();

        unsafe { std::env::remove_var("NPMV_CONFIG_DIR") };
        assert_eq!(resolved, dir.path());
    }
}
