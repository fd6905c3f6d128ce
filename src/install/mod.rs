//! Install lifecycle of npm releases
//!
//! # Modules
//!
//! - [`installer`]: download, extract and repair a release, once
//! - [`remover`]: delete an installed release
//! - [`repair`]: replace symlinks that do not resolve on the host filesystem

pub mod installer;
pub mod remover;
pub mod repair;

pub use installer::Installer;
pub use remover::Remover;
pub use repair::{LinkFs, NativeFs, SymlinkRepair};
