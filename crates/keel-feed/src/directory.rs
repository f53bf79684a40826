//! Local directory feeds.

use crate::{Feed, FeedError, Memo, PackageInfo};
use flate2::read::GzDecoder;
use keel_manifest::PackageManifest;
use keel_version::Version;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::Archive;

/// A feed backed by a local folder.
///
/// Two layouts are recognized and may coexist:
///
/// - flat archives: `{root}/{name}.{version}.keelpkg`
/// - store-style installs: `{root}/{name}/{version}/manifest.json` plus the
///   archive alongside it
pub struct DirectoryFeed {
    name: String,
    root: PathBuf,
    versions: Memo<String, Vec<PackageInfo>>,
}

impl DirectoryFeed {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: root.display().to_string(),
            root,
            versions: Memo::new(),
        }
    }

    fn scan(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        let mut found = Vec::new();

        // Store-style: {root}/{name}/{version}/.
        if self.root.is_dir() {
            for name_entry in fs::read_dir(&self.root)? {
                let name_entry = name_entry?;
                let dir_name = name_entry.file_name().to_string_lossy().into_owned();
                if !dir_name.eq_ignore_ascii_case(id) || !name_entry.path().is_dir() {
                    continue;
                }
                for version_entry in fs::read_dir(name_entry.path())? {
                    let version_entry = version_entry?;
                    let Ok(version) =
                        Version::parse(&version_entry.file_name().to_string_lossy())
                    else {
                        continue;
                    };
                    let archive = version_entry.path().join(format!(
                        "{}.{}.keelpkg",
                        dir_name, version
                    ));
                    if archive.is_file() {
                        found.push(PackageInfo {
                            id: dir_name.clone(),
                            version,
                            content_uri: archive.display().to_string(),
                        });
                    }
                }
            }

            // Flat archives: {root}/{name}.{version}.keelpkg.
            for entry in fs::read_dir(&self.root)? {
                let entry = entry?;
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if let Some((name, version)) = parse_archive_name(&file_name)
                    && name.eq_ignore_ascii_case(id)
                {
                    found.push(PackageInfo {
                        id: name,
                        version,
                        content_uri: entry.path().display().to_string(),
                    });
                }
            }
        }

        found.sort_by(|a, b| a.version.cmp(&b.version));
        found.dedup_by(|a, b| a.version == b.version);
        Ok(found)
    }
}

impl Feed for DirectoryFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_versions(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        let key = id.to_ascii_lowercase();
        self.versions.get_or_try_init(&key, || self.scan(id))
    }

    fn find_versions_uncached(&self, id: &str) -> Result<Vec<PackageInfo>, FeedError> {
        self.versions.invalidate(&id.to_ascii_lowercase());
        self.find_versions(id)
    }

    fn open_manifest(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        let archive_path = Path::new(&info.content_uri);
        // Store-style installs keep the manifest extracted next door.
        if let Some(dir) = archive_path.parent() {
            let manifest = dir.join("manifest.json");
            if manifest.is_file() {
                return Ok(Box::new(File::open(manifest)?));
            }
        }
        let bytes = read_manifest_from_archive(archive_path)?;
        Ok(Box::new(io::Cursor::new(bytes)))
    }

    fn open_archive(&self, info: &PackageInfo) -> Result<Box<dyn Read + Send>, FeedError> {
        Ok(Box::new(File::open(Path::new(&info.content_uri))?))
    }
}

/// Split `name.1.2.3.keelpkg` into its name and version. The version is the
/// longest parseable dotted suffix, so package names may themselves contain
/// dots.
fn parse_archive_name(file_name: &str) -> Option<(String, Version)> {
    let stem = file_name.strip_suffix(".keelpkg")?;
    // Leftmost split first: a bare trailing component like "0" would also
    // parse, and would eat part of the real version.
    for (split, _) in stem.match_indices('.') {
        let (name, version_text) = (&stem[..split], &stem[split + 1..]);
        if let Ok(version) = Version::parse(version_text)
            && !name.is_empty()
        {
            return Some((name.to_string(), version));
        }
    }
    None
}

/// Pull the manifest entry out of a `.keelpkg` without extracting it.
fn read_manifest_from_archive(path: &Path) -> Result<Vec<u8>, FeedError> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.as_os_str() == "manifest.json" {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return Ok(bytes);
        }
    }
    Err(FeedError::MalformedResponse {
        feed: path.display().to_string(),
        resource: "manifest.json".to_string(),
        reason: "archive has no manifest entry".to_string(),
    })
}

/// Convenience used by providers: parse the manifest for one version.
pub fn manifest_from_feed(
    feed: &dyn Feed,
    info: &PackageInfo,
) -> Result<PackageManifest, FeedError> {
    let reader = feed.open_manifest(info)?;
    Ok(PackageManifest::from_reader(
        reader,
        Path::new("manifest.json"),
    )?)
}
