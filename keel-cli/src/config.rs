//! Environment resolution.
//!
//! The core crates never read the environment; everything is resolved here
//! into a plain [`RestoreConfig`] value.

use keel_restore::{FeedSource, RestoreConfig};
use std::env;
use std::path::PathBuf;

/// Ordered package store roots, OS-path-separator delimited.
pub const PACKAGES_VAR: &str = "KEEL_PACKAGES";

/// HTTP response cache root.
pub const HTTP_CACHE_VAR: &str = "KEEL_HTTP_CACHE";

/// Default package sources, semicolon delimited.
pub const SOURCES_VAR: &str = "KEEL_SOURCES";

/// Store roots: the flag wins, then `KEEL_PACKAGES`, then `~/.keel/packages`.
pub fn package_roots(flag: Option<&str>) -> Vec<PathBuf> {
    if let Some(dir) = flag {
        return vec![PathBuf::from(dir)];
    }
    if let Ok(value) = env::var(PACKAGES_VAR)
        && !value.is_empty()
    {
        return env::split_paths(&value).collect();
    }
    vec![home_dir().join(".keel").join("packages")]
}

pub fn http_cache_root() -> PathBuf {
    env::var(HTTP_CACHE_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".keel").join("http-cache"))
}

/// Sources: `--source` flags win outright over `KEEL_SOURCES`.
pub fn sources(flags: &[String]) -> Vec<FeedSource> {
    if !flags.is_empty() {
        return flags.iter().map(|s| FeedSource::parse(s)).collect();
    }
    match env::var(SOURCES_VAR) {
        Ok(value) => value
            .split(';')
            .filter(|s| !s.is_empty())
            .map(FeedSource::parse)
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub fn build(
    packages_flag: Option<&str>,
    source_flags: &[String],
    no_cache: bool,
    ignore_failed_sources: bool,
    runtimes: Vec<String>,
) -> RestoreConfig {
    RestoreConfig {
        package_roots: package_roots(packages_flag),
        http_cache_root: http_cache_root(),
        sources: sources(source_flags),
        ignore_failed_sources,
        bypass_http_cache: no_cache,
        runtimes,
    }
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
