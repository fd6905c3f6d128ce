//! Release tarball and manager test utilities

use std::path::PathBuf;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::{Mock, ServerGuard};
use tempfile::TempDir;

use npmv::config::{Feed, GLOBAL_FILE_NAME, INSTALL_DIR_NAME};
use npmv::host::HostRuntime;
use npmv::install::Installer;
use npmv::manager::VersionManager;
use npmv::store::VersionStore;
use npmv::version::installed::InstalledVersions;
use npmv::version::registry::ReleaseCatalog;

/// Gzipped tarball shaped like a GitHub source archive of npm/cli
pub fn tarball(version: &str) -> Vec<u8> {
    let files = [
        ("bin/npm-cli.js", "#!/usr/bin/env node\n"),
        (
            "package.json",
            r#"{"name":"npm","version":"0.0.0"}"#,
        ),
    ];

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let contents = contents.replace("0.0.0", version);
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("cli-{version}/{path}"), contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Serve the tarball of `version` at the codeload path, expecting `hits` requests
pub async fn mock_download(server: &mut ServerGuard, version: &str, hits: usize) -> Mock {
    server
        .mock("GET", format!("/npm/cli/tar.gz/v{version}").as_str())
        .with_status(200)
        .with_body(tarball(version))
        .expect(hits)
        .create_async()
        .await
}

/// Create a working directory below the manager's config directory, where the
/// search for `.npm-version` files ends
pub fn project_dir(config_dir: &TempDir, name: &str) -> PathBuf {
    let dir = config_dir.path().join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Create a manager rooted in a fresh config directory
pub fn create_test_manager(
    server: &ServerGuard,
    catalog: Arc<dyn ReleaseCatalog>,
    host: Arc<dyn HostRuntime>,
) -> (TempDir, VersionManager) {
    let config_dir = TempDir::new().unwrap();
    let installed = Arc::new(InstalledVersions::new(
        config_dir.path().join(INSTALL_DIR_NAME),
    ));
    let installer = Installer::new(&server.url(), Feed::new("npm", "cli"), installed.clone());
    let store = VersionStore::new(config_dir.path().join(GLOBAL_FILE_NAME))
        .with_search_ceiling(config_dir.path());

    let manager = VersionManager::build(catalog, host, installed, installer, store);
    (config_dir, manager)
}
