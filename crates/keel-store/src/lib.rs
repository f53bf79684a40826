//! The on-disk package store for Keel.
//!
//! Installed packages live under `{root}/{name}/{version}/`. An install is
//! complete if and only if its `.sha512` sidecar file exists; the sidecar is
//! always written last, so a crash mid-install leaves the package looking
//! not-installed and a later attempt redoes the work. Concurrent installs of
//! the same package, from any number of processes, are serialized by an
//! advisory file lock on the archive path.

mod hash;
mod install;
mod lock;
mod pack;
mod paths;

pub use hash::{hash_bytes, hash_reader};
pub use install::InstallOutcome;
pub use lock::InstallLock;
pub use pack::PackageBuilder;
pub use paths::{PackageStore, StorePathResolver};

use std::path::PathBuf;
use thiserror::Error;

/// File name of the manifest inside a package archive and install directory.
pub const PACKAGE_MANIFEST_NAME: &str = "manifest.json";

/// Extension of package archives.
pub const ARCHIVE_EXTENSION: &str = "keelpkg";

/// Extension of the content-hash sidecar, appended to the archive name.
pub const HASH_EXTENSION: &str = "sha512";

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive is missing required entry '{expected}'")]
    MissingManifest { expected: String },

    #[error("archive manifest declares {actual}, expected {expected}")]
    IdentityMismatch { expected: String, actual: String },

    #[error("invalid package manifest: {0}")]
    Manifest(#[from] keel_manifest::ManifestError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("package not installed: {0}")]
    NotInstalled(PathBuf),
}
