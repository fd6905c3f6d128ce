//! Version resolution layer
//!
//! Turns version specifiers into concrete npm versions, consulting either the
//! remote release catalog or the versions already installed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registries │────▶│  Resolver   │◀────│  Installed  │
//! │  (catalog)  │     │ (specifier) │     │   (cache)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │    Range    │
//!                     │ (npm semver)│
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`error`]: Error types for catalog, host, resolution and install operations
//! - [`installed`]: Memoized listing of the install repository
//! - [`range`]: npm range grammar
//! - [`registry`]: Catalog trait for listing published releases
//! - [`registries`]: Concrete catalog implementations (GitHub releases)
//! - [`resolver`]: Specifier classification and resolution
//! - [`semver`]: Shared semver utilities

pub mod error;
pub mod installed;
pub mod range;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod semver;
