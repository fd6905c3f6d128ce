//! Catalog implementations for listing npm releases

pub mod github;

pub use github::GitHubReleases;
