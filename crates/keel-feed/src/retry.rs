//! Retry decorator for unreliable feeds.

use crate::{Feed, FeedError, PackageInfo};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

/// Number of attempts before a feed is declared exhausted.
const MAX_ATTEMPTS: u32 = 3;

/// Wraps a feed with bounded retries on transient failures.
///
/// The last attempt of a version lookup bypasses the inner feed's response
/// cache, so a poisoned cache entry cannot make the feed permanently
/// unavailable. With `ignore_failures` set, an exhausted feed degrades to
/// answering "no versions" instead of failing the whole operation; the
/// `was_ignored` flag records that this happened so callers can warn.
pub struct RetryFeed {
    inner: Box<dyn Feed>,
    ignore_failures: bool,
    ignored: AtomicBool,
}

impl RetryFeed {
    pub fn new(inner: Box<dyn Feed>) -> Self {
        Self {
            inner,
            ignore_failures: false,
            ignored: AtomicBool::new(false),
        }
    }

    pub fn ignore_failures(mut self, ignore: bool) -> Self {
        self.ignore_failures = ignore;
        self
    }

    /// Whether a failure of this feed has been swallowed.
    pub fn was_ignored(&self) -> bool {
        self.ignored.load(Ordering::Relaxed)
    }

    fn retry<T>(
        &self,
        mut op: impl FnMut(bool) -> Result<T, FeedError>,
    ) -> Result<T, FeedError> {
        let mut attempt = 1;
        loop {
            let last = attempt == MAX_ATTEMPTS;
            match op(last) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && !last => attempt += 1,
                Err(e) => {
                    return Err(FeedError::Exhausted {
                        feed: self.inner.name().to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}

impl Feed for RetryFeed {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn find_versions(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        if self.ignored.load(Ordering::Relaxed) {
            // Once ignored, stay silent for the rest of the operation.
            return Ok(Vec::new());
        }
        let result = self.retry(|bypass_cache| {
            if bypass_cache {
                self.inner.find_versions_uncached(id)
            } else {
                self.inner.find_versions(id)
            }
        });
        match result {
            Ok(versions) => Ok(versions),
            Err(_) if self.ignore_failures => {
                self.ignored.store(true, Ordering::Relaxed);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn open_manifest(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        self.retry(|_| self.inner.open_manifest(info))
    }

    fn open_archive(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        self.retry(|_| self.inner.open_archive(info))
    }
}
