//! HTTP fetching with a disk-backed response cache.

use crate::FeedError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default user agent.
const USER_AGENT: &str = "keel-feed/0.3";

/// Default maximum age of a cached response.
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// Blocking HTTP source with opportunistic disk caching.
///
/// Responses are cached under a key derived from (base URI, resource key),
/// aged out after `max_age`, and invalidated when the caller's validation
/// rejects the cached bytes (one forced re-fetch follows; if the fresh bytes
/// also fail validation the error propagates).
pub struct HttpSource {
    client: reqwest::blocking::Client,
    cache_dir: PathBuf,
    max_age: Duration,
}

impl HttpSource {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, FeedError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            cache_dir,
            max_age: DEFAULT_MAX_AGE,
        })
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Fetch `url`, caching under (base, resource).
    ///
    /// `validate` is a structural check on the payload (for example "parses
    /// as JSON" or "looks like a gzip stream"); a cached entry failing it is
    /// deleted and fetched fresh once.
    pub fn get(
        &self,
        base: &str,
        resource: &str,
        url: &str,
        bypass_cache: bool,
        validate: impl Fn(&[u8]) -> bool,
    ) -> Result<Vec<u8>, FeedError> {
        let cache_path = self.cache_path(base, resource);

        if !bypass_cache && let Some(bytes) = self.read_fresh(&cache_path) {
            if validate(&bytes) {
                return Ok(bytes);
            }
            // Corrupt cache entry: drop it and fall through to a re-fetch.
            let _ = fs::remove_file(&cache_path);
        }

        let bytes = self.fetch(url)?;
        if !validate(&bytes) {
            return Err(FeedError::MalformedResponse {
                feed: base.to_string(),
                resource: resource.to_string(),
                reason: "response failed validation".to_string(),
            });
        }

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&cache_path, &bytes)?;
        Ok(bytes)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(url).send()?;
        let response = response.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    /// A cached response younger than `max_age`, if any.
    fn read_fresh(&self, path: &PathBuf) -> Option<Vec<u8>> {
        let meta = fs::metadata(path).ok()?;
        let modified = meta.modified().ok()?;
        let age = SystemTime::now().duration_since(modified).ok()?;
        if age > self.max_age {
            return None;
        }
        fs::read(path).ok()
    }

    /// Cache path: a stable hash of (base, resource), sharded by prefix the
    /// same way the package store shards by hash.
    fn cache_path(&self, base: &str, resource: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(base.as_bytes());
        hasher.update(b"\n");
        hasher.update(resource.as_bytes());
        let hex: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        self.cache_dir.join(&hex[..2]).join(format!("{hex}.dat"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_stable_and_distinct() {
        let temp = tempfile::tempdir().unwrap();
        let source = HttpSource::new(temp.path()).unwrap();

        let a = source.cache_path("https://feed.example", "pkg/index.json");
        let b = source.cache_path("https://feed.example", "pkg/index.json");
        let c = source.cache_path("https://other.example", "pkg/index.json");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_stale_cache_ignored() {
        let temp = tempfile::tempdir().unwrap();
        let source = HttpSource::new(temp.path())
            .unwrap()
            .with_max_age(Duration::ZERO);

        let path = source.cache_path("base", "res");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"cached").unwrap();
        assert!(source.read_fresh(&path).is_none());
    }

    #[test]
    fn test_fresh_cache_read() {
        let temp = tempfile::tempdir().unwrap();
        let source = HttpSource::new(temp.path()).unwrap();

        let path = source.cache_path("base", "res");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"cached").unwrap();
        assert_eq!(source.read_fresh(&path).unwrap(), b"cached");
    }
}
