//! Restore orchestration.
//!
//! Ties the other crates together: parse the project manifest, walk each
//! target framework's graph, install whatever is missing from the store,
//! select assets per target, and write the lock file.

mod config;
mod context;
mod restore;

pub use config::{FeedSource, RestoreConfig};
pub use context::{FrameworkRestore, RestoreContext};
pub use restore::{DEFAULT_FRAMEWORK, RestoreSummary, needs_restore, restore};

use keel_version::Version;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Manifest(#[from] keel_manifest::ManifestError),

    #[error(transparent)]
    Framework(#[from] keel_framework::FrameworkError),

    #[error(transparent)]
    Walk(#[from] keel_walker::WalkError),

    #[error(transparent)]
    Feed(#[from] keel_feed::FeedError),

    #[error(transparent)]
    Store(#[from] keel_store::StoreError),

    #[error(transparent)]
    Lock(#[from] keel_lock::LockError),

    #[error("no package store root is configured")]
    NoStoreRoot,

    #[error("package '{name}' {version} is not available from any source")]
    PackageUnavailable { name: String, version: Version },

    #[error("a restore worker thread panicked")]
    WorkerPanicked,
}
