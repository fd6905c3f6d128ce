#![allow(dead_code)]

pub mod archive;
pub mod catalog;

pub use archive::{create_test_manager, mock_download, project_dir, tarball};
pub use catalog::{FixedHost, MockCatalog};
