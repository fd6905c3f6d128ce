//! npmv: install npm versions side by side and switch between them
//!
//! # Modules
//!
//! - [`config`]: Paths, constants and user settings
//! - [`version`]: Specifier resolution against the catalog or installed set
//! - [`install`]: Install, remove and post-install symlink repair
//! - [`store`]: Global and per-directory active-version files
//! - [`host`]: The Node.js runtime npm belongs to
//! - [`manager`]: Wiring used by the commands
//! - [`cli`]: Command-line surface

pub mod cli;
pub mod config;
pub mod host;
pub mod install;
pub mod manager;
pub mod store;
pub mod version;
