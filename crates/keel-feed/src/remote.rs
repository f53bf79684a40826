//! Remote feeds over HTTP.
//!
//! Two wire shapes are supported. [`RemoteIndexFeed`] speaks the paginated
//! registration index: `{base}/{id}/index.json` lists pages, each page either
//! inlines its entries or names a URL to fetch them from. [`RemoteFlatFeed`]
//! speaks the simpler flat listing: `{base}/{id}/index.json` is a bare list
//! of version strings and archives live at well-known paths.

use crate::{Feed, FeedError, HttpSource, Memo, PackageInfo};
use keel_version::Version;
use serde::Deserialize;
use std::io::{self, Read};

/// Paginated registration index feed.
pub struct RemoteIndexFeed {
    name: String,
    base: String,
    source: HttpSource,
    versions: Memo<String, Vec<PackageInfo>>,
}

#[derive(Deserialize)]
struct IndexDocument {
    #[serde(default)]
    pages: Vec<IndexPage>,
}

/// One page of a registration index. Pages either inline their entries or
/// point at a URL holding them; never both in practice, but inline wins when
/// both are present.
#[derive(Deserialize)]
struct IndexPage {
    #[serde(default)]
    entries: Vec<IndexEntry>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct IndexEntry {
    id: String,
    version: String,
    #[serde(rename = "contentUrl")]
    content_url: String,
}

impl RemoteIndexFeed {
    pub fn new(base: impl Into<String>, source: HttpSource) -> Self {
        let base = base.into();
        Self {
            name: base.clone(),
            base: base.trim_end_matches('/').to_string(),
            source,
            versions: Memo::new(),
        }
    }

    fn query(&self, id: &str, bypass_cache: bool) -> Result<Vec<PackageInfo>, FeedError> {
        let resource = format!("{}/index.json", id.to_ascii_lowercase());
        let url = format!("{}/{}", self.base, resource);
        let bytes = self
            .source
            .get(&self.base, &resource, &url, bypass_cache, is_json)?;
        let index: IndexDocument = parse_json(&self.base, &resource, &bytes)?;

        let mut found = Vec::new();
        for (page_index, page) in index.pages.into_iter().enumerate() {
            let entries = if !page.entries.is_empty() {
                page.entries
            } else if let Some(page_url) = page.url {
                let page_resource = format!("{}#page{}", resource, page_index);
                let bytes =
                    self.source
                        .get(&self.base, &page_resource, &page_url, bypass_cache, is_json)?;
                let page: IndexPage = parse_json(&self.base, &page_resource, &bytes)?;
                page.entries
            } else {
                continue;
            };

            for entry in entries {
                let version = Version::parse(&entry.version).map_err(|e| {
                    FeedError::MalformedResponse {
                        feed: self.base.clone(),
                        resource: resource.clone(),
                        reason: e.to_string(),
                    }
                })?;
                found.push(PackageInfo {
                    id: entry.id,
                    version,
                    content_uri: entry.content_url,
                });
            }
        }

        found.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(found)
    }

    fn open(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        let resource = format!("{}/{}", info.id.to_ascii_lowercase(), info.version);
        let bytes = self
            .source
            .get(&self.base, &resource, &info.content_uri, false, is_gzip)?;
        Ok(Box::new(io::Cursor::new(bytes)))
    }
}

impl Feed for RemoteIndexFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_versions(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        let key = id.to_ascii_lowercase();
        self.versions.get_or_try_init(&key, || self.query(id, false))
    }

    fn find_versions_uncached(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        let key = id.to_ascii_lowercase();
        self.versions.invalidate(&key);
        self.versions.get_or_try_init(&key, || self.query(id, true))
    }

    fn open_manifest(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        // The index serves whole archives; the manifest rides inside.
        let mut archive = self.open(info)?;
        let mut bytes = Vec::new();
        archive.read_to_end(&mut bytes)?;
        let manifest = manifest_entry(&self.base, info, &bytes)?;
        Ok(Box::new(io::Cursor::new(manifest)))
    }

    fn open_archive(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        self.open(info)
    }
}

/// Flat listing feed: index is a plain array of version strings.
pub struct RemoteFlatFeed {
    name: String,
    base: String,
    source: HttpSource,
    versions: Memo<String, Vec<PackageInfo>>,
}

impl RemoteFlatFeed {
    pub fn new(base: impl Into<String>, source: HttpSource) -> Self {
        let base = base.into();
        Self {
            name: base.clone(),
            base: base.trim_end_matches('/').to_string(),
            source,
            versions: Memo::new(),
        }
    }

    fn query(&self, id: &str, bypass_cache: bool) -> Result<Vec<PackageInfo>, FeedError> {
        let id_lower = id.to_ascii_lowercase();
        let resource = format!("{}/index.json", id_lower);
        let url = format!("{}/{}", self.base, resource);
        let bytes = self
            .source
            .get(&self.base, &resource, &url, bypass_cache, is_json)?;
        let versions: Vec<String> = parse_json(&self.base, &resource, &bytes)?;

        let mut found = Vec::new();
        for text in versions {
            let version =
                Version::parse(&text).map_err(|e| FeedError::MalformedResponse {
                    feed: self.base.clone(),
                    resource: resource.clone(),
                    reason: e.to_string(),
                })?;
            let content_uri = format!(
                "{}/{}/{}/{}.{}.keelpkg",
                self.base, id_lower, version, id_lower, version
            );
            found.push(PackageInfo {
                id: id.to_string(),
                version,
                content_uri,
            });
        }

        found.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(found)
    }

    fn open(&self, info: &PackageInfo) -> Result<Vec<u8>, FeedError> {
        let resource = format!(
            "{}/{}/archive",
            info.id.to_ascii_lowercase(),
            info.version
        );
        self.source
            .get(&self.base, &resource, &info.content_uri, false, is_gzip)
    }
}

impl Feed for RemoteFlatFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_versions(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        let key = id.to_ascii_lowercase();
        self.versions.get_or_try_init(&key, || self.query(id, false))
    }

    fn find_versions_uncached(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        let key = id.to_ascii_lowercase();
        self.versions.invalidate(&key);
        self.versions.get_or_try_init(&key, || self.query(id, true))
    }

    fn open_manifest(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        let bytes = self.open(info)?;
        let manifest = manifest_entry(&self.base, info, &bytes)?;
        Ok(Box::new(io::Cursor::new(manifest)))
    }

    fn open_archive(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        Ok(Box::new(io::Cursor::new(self.open(info)?)))
    }
}

fn is_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(bytes).is_ok()
}

/// Gzip magic number check. Enough to reject HTML error pages served with a
/// 200 status.
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

fn parse_json<'a, T: Deserialize<'a>>(
    base: &str,
    resource: &str,
    bytes: &'a [u8],
) -> Result<T, FeedError> {
    serde_json::from_slice(bytes).map_err(|e| FeedError::MalformedResponse {
        feed: base.to_string(),
        resource: resource.to_string(),
        reason: e.to_string(),
    })
}

fn manifest_entry(
    base: &str,
    info: &PackageInfo,
    archive_bytes: &[u8],
) -> Result<Vec<u8>, FeedError> {
    let decoder = flate2::read::GzDecoder::new(io::Cursor::new(archive_bytes));
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.as_os_str() == "manifest.json" {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return Ok(bytes);
        }
    }
    Err(FeedError::MalformedResponse {
        feed: base.to_string(),
        resource: format!("{}/{}", info.id, info.version),
        reason: "archive has no manifest entry".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_document_shapes() {
        // Inline entries.
        let doc: IndexDocument = serde_json::from_str(
            r#"{"pages":[{"entries":[{"id":"demo","version":"1.0.0","contentUrl":"https://f/demo/1.0.0.keelpkg"}]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].entries[0].version, "1.0.0");

        // Page by reference.
        let doc: IndexDocument = serde_json::from_str(
            r#"{"pages":[{"url":"https://f/demo/page0.json"}]}"#,
        )
        .unwrap();
        assert!(doc.pages[0].entries.is_empty());
        assert_eq!(doc.pages[0].url.as_deref(), Some("https://f/demo/page0.json"));
    }

    #[test]
    fn test_gzip_sniffing() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(b"<html>503</html>"));
        assert!(!is_gzip(&[0x1f]));
    }

    #[test]
    fn test_flat_content_uri_layout() {
        let temp = tempfile::tempdir().unwrap();
        let source = HttpSource::new(temp.path()).unwrap();
        let feed = RemoteFlatFeed::new("https://feed.example/v1/", source);
        // Trailing slash on the base is normalized away.
        assert_eq!(feed.base, "https://feed.example/v1");
    }
}
