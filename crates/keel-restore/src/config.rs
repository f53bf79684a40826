//! Resolved restore configuration.
//!
//! The CLI reads the environment and flags; the core receives plain values.

use crate::RestoreError;
use keel_feed::{DirectoryFeed, Feed, HttpSource, RemoteFlatFeed, RemoteIndexFeed, RetryFeed};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// One package source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// A local folder of archives or store-style installs.
    Directory(PathBuf),
    /// A flat remote listing: `{base}/{id}/index.json` is an array of
    /// version strings.
    RemoteFlat(String),
    /// A paginated remote registration index.
    RemoteIndex(String),
}

impl FeedSource {
    /// Classify a `--source` argument. `index+` marks a paginated index;
    /// any other URL is the flat layout; everything else is a folder.
    pub fn parse(text: &str) -> Self {
        if let Some(url) = text.strip_prefix("index+") {
            FeedSource::RemoteIndex(url.to_string())
        } else if text.starts_with("http://") || text.starts_with("https://") {
            FeedSource::RemoteFlat(text.to_string())
        } else {
            FeedSource::Directory(PathBuf::from(text))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Directory(path) => write!(f, "{}", path.display()),
            FeedSource::RemoteFlat(url) => write!(f, "{url}"),
            FeedSource::RemoteIndex(url) => write!(f, "index+{url}"),
        }
    }
}

/// Everything a restore needs to know, fully resolved.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Ordered store roots; reads fall back through all of them, installs
    /// land in the first.
    pub package_roots: Vec<PathBuf>,
    pub http_cache_root: PathBuf,
    pub sources: Vec<FeedSource>,
    /// Degrade failing sources to empty results instead of aborting.
    pub ignore_failed_sources: bool,
    /// Treat all cached HTTP responses as stale.
    pub bypass_http_cache: bool,
    /// Acceptable runtime identifiers, most preferred first.
    pub runtimes: Vec<String>,
}

impl RestoreConfig {
    /// Instantiate the configured sources, each wrapped in the retry
    /// decorator. The concrete [`RetryFeed`] type is kept so callers can ask
    /// afterwards which sources were ignored.
    pub fn build_feeds(&self) -> Result<Vec<Arc<RetryFeed>>, RestoreError> {
        let mut feeds = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let inner: Box<dyn Feed> = match source {
                FeedSource::Directory(path) => Box::new(DirectoryFeed::new(path.clone())),
                FeedSource::RemoteFlat(url) => {
                    Box::new(RemoteFlatFeed::new(url.clone(), self.http_source()?))
                }
                FeedSource::RemoteIndex(url) => {
                    Box::new(RemoteIndexFeed::new(url.clone(), self.http_source()?))
                }
            };
            feeds.push(Arc::new(
                RetryFeed::new(inner).ignore_failures(self.ignore_failed_sources),
            ));
        }
        Ok(feeds)
    }

    fn http_source(&self) -> Result<HttpSource, RestoreError> {
        let source = HttpSource::new(&self.http_cache_root)?;
        Ok(if self.bypass_http_cache {
            source.with_max_age(Duration::ZERO)
        } else {
            source
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_classification() {
        assert_eq!(
            FeedSource::parse("https://feed.example/v1"),
            FeedSource::RemoteFlat("https://feed.example/v1".to_string())
        );
        assert_eq!(
            FeedSource::parse("index+https://feed.example/v2"),
            FeedSource::RemoteIndex("https://feed.example/v2".to_string())
        );
        assert_eq!(
            FeedSource::parse("/var/packages"),
            FeedSource::Directory(PathBuf::from("/var/packages"))
        );
    }
}
