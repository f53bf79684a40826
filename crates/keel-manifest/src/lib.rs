//! Manifest parsing for Keel.
//!
//! Two manifest kinds exist:
//!
//! - the *project* manifest (`keel.json`): the dependencies a project
//!   declares, optionally scoped per target framework;
//! - the *package* manifest (`manifest.json` inside a package archive): the
//!   package's own authoritative identity and dependency sets.

mod package;
mod project;

pub use package::{FrameworkAssembly, PackageDependencySet, PackageManifest};
pub use project::{
    DependencyTarget, ProjectDependency, ProjectManifest, PROJECT_MANIFEST_NAME,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading or parsing manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed manifest JSON. serde_json's message carries line/column.
    #[error("invalid manifest {path}: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid version in manifest {path}: {source}")]
    Version {
        path: PathBuf,
        source: keel_version::VersionError,
    },

    #[error("invalid range for dependency '{dependency}' of package '{package}': {source}")]
    Range {
        package: String,
        dependency: String,
        source: keel_version::VersionError,
    },

    #[error("invalid framework in manifest {path}: {source}")]
    Framework {
        path: PathBuf,
        source: keel_framework::FrameworkError,
    },
}
