//! Transitive dependency resolution.
//!
//! The walker turns a project's declared dependencies into a flat, fully
//! resolved library set for one target framework. Providers supply
//! candidates (sibling projects, a pinned lock, package feeds, framework
//! references); the walker owns the worklist, the cycle breaking, and the
//! cross-path version reconciliation.

mod library;
mod provider;
mod walker;

pub use library::{
    LibraryDependency, LibraryDescription, LibraryIdentity, LibraryKind, LibraryRange,
};
pub use provider::{
    DependencyProvider, FeedProvider, FrameworkReferenceProvider, LockPinnedProvider,
    ProjectReferenceProvider,
};
pub use walker::{DependencyWalker, WalkResult};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Feed(#[from] keel_feed::FeedError),

    #[error(transparent)]
    Manifest(#[from] keel_manifest::ManifestError),

    #[error(transparent)]
    Version(#[from] keel_version::VersionError),
}
