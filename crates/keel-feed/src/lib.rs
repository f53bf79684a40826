//! Package feeds for Keel.
//!
//! A feed is a source of package metadata and payloads, local or remote.
//! Every feed answers the same three questions through the [`Feed`] trait:
//! which versions of a package exist, and how to open the manifest and
//! archive of one of them. Retry and response-caching behavior is layered on
//! with decorators rather than inherited.

mod directory;
mod http;
mod memo;
mod remote;
mod retry;

pub use directory::{DirectoryFeed, manifest_from_feed};
pub use http::HttpSource;
pub use memo::Memo;
pub use remote::{RemoteFlatFeed, RemoteIndexFeed};
pub use retry::RetryFeed;

use keel_version::Version;
use std::io::Read;
use thiserror::Error;

/// A transient feed query result: one concrete version of a package and
/// where its content lives. Consumed immediately, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub id: String,
    pub version: Version,
    /// Feed-specific locator: a file path for local feeds, a URL for remote
    /// ones.
    pub content_uri: String,
}

/// Errors produced by feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response from feed '{feed}' for '{resource}': {reason}")]
    MalformedResponse {
        feed: String,
        resource: String,
        reason: String,
    },

    #[error("package '{id}' has no entry for version {version}")]
    UnknownVersion { id: String, version: Version },

    #[error("feed '{feed}' failed after {attempts} attempts: {source}")]
    Exhausted {
        feed: String,
        attempts: u32,
        #[source]
        source: Box<FeedError>,
    },

    #[error("invalid package manifest: {0}")]
    Manifest(#[from] keel_manifest::ManifestError),
}

impl FeedError {
    /// Whether retrying may help. Format problems never heal on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Io(_) | FeedError::Http(_))
    }
}

/// A source of package metadata and payloads.
pub trait Feed: Send + Sync {
    /// Human-readable identity, used in diagnostics.
    fn name(&self) -> &str;

    /// All known versions of `id`. An unknown package is an empty list, not
    /// an error.
    fn find_versions(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError>;

    /// Like [`Feed::find_versions`], but bypassing any response cache the
    /// feed keeps. Feeds without a cache just delegate.
    fn find_versions_uncached(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        self.find_versions(id)
    }

    /// Open the package manifest of a concrete version.
    fn open_manifest(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError>;

    /// Open the package archive of a concrete version.
    fn open_archive(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError>;
}
