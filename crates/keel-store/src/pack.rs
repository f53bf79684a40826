//! Building package archives.
//!
//! The inverse of installation: assemble a manifest and payload files into a
//! `.keelpkg` (gzip-compressed tar). Used by `keel pack` and heavily by
//! tests that need feeds to serve real archives.

use crate::StoreError;
use flate2::Compression;
use flate2::write::GzEncoder;
use keel_manifest::{PackageDependencySet, PackageManifest};
use keel_framework::FrameworkName;
use keel_version::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Builds a package archive in memory.
pub struct PackageBuilder {
    manifest: PackageManifest,
    files: Vec<(String, Vec<u8>)>,
}

impl PackageBuilder {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            manifest: PackageManifest {
                id: id.into(),
                version,
                dependency_sets: Vec::new(),
                framework_assemblies: Vec::new(),
                references: Vec::new(),
            },
            files: Vec::new(),
        }
    }

    /// Add a dependency applying to every framework.
    pub fn dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        let set = self.frameworkless_set();
        set.dependencies.insert(name.into(), range.into());
        self
    }

    /// Add a dependency scoped to one framework.
    pub fn framework_dependency(
        mut self,
        framework: FrameworkName,
        name: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        let set = self
            .manifest
            .dependency_sets
            .iter_mut()
            .position(|s| s.framework.as_ref() == Some(&framework));
        let set = match set {
            Some(i) => &mut self.manifest.dependency_sets[i],
            None => {
                self.manifest.dependency_sets.push(PackageDependencySet {
                    framework: Some(framework),
                    dependencies: BTreeMap::new(),
                });
                self.manifest
                    .dependency_sets
                    .last_mut()
                    .expect("just pushed")
            }
        };
        set.dependencies.insert(name.into(), range.into());
        self
    }

    /// Add a payload file.
    pub fn file(mut self, path: impl Into<String>, contents: &[u8]) -> Self {
        self.files.push((path.into(), contents.to_vec()));
        self
    }

    /// Build the archive bytes.
    pub fn build(self) -> Result<Vec<u8>, StoreError> {
        let manifest_json = self.manifest.to_json()?;
        let mut entries: Vec<(String, Vec<u8>)> =
            vec![(crate::PACKAGE_MANIFEST_NAME.to_string(), manifest_json.into_bytes())];
        entries.extend(self.files);

        let borrowed: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_slice()))
            .collect();
        Self::raw_archive(&borrowed)
    }

    /// Build and write the archive next to `dir` as
    /// `{id}.{version}.keelpkg`, returning its path.
    pub fn write_to(self, dir: &Path) -> Result<std::path::PathBuf, StoreError> {
        let file_name = format!(
            "{}.{}.{}",
            self.manifest.id,
            self.manifest.version,
            crate::ARCHIVE_EXTENSION
        );
        let path = dir.join(file_name);
        let bytes = self.build()?;
        fs::create_dir_all(dir)?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Build a tar.gz from raw entries, no manifest added. Mostly useful for
    /// exercising corrupt-archive handling.
    pub fn raw_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>, StoreError> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents)?;
        }

        let encoder = builder.into_inner()?;
        Ok(encoder.finish()?)
    }

    fn frameworkless_set(&mut self) -> &mut PackageDependencySet {
        let pos = self
            .manifest
            .dependency_sets
            .iter()
            .position(|s| s.framework.is_none());
        match pos {
            Some(i) => &mut self.manifest.dependency_sets[i],
            None => {
                self.manifest.dependency_sets.push(PackageDependencySet {
                    framework: None,
                    dependencies: BTreeMap::new(),
                });
                self.manifest
                    .dependency_sets
                    .last_mut()
                    .expect("just pushed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_contains_manifest() {
        let bytes = PackageBuilder::new("demo", Version::new(1, 0, 0))
            .dependency("base", "1.0.0")
            .file("lib/keel45/demo.klib", b"code")
            .build()
            .unwrap();

        // Round-trip through the extraction path.
        let decoder = flate2::read::GzDecoder::new(std::io::Cursor::new(&bytes));
        let mut archive = tar::Archive::new(decoder);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"manifest.json".to_string()));
        assert!(names.contains(&"lib/keel45/demo.klib".to_string()));
    }

    #[test]
    fn test_write_to_names_archive() {
        let temp = tempfile::tempdir().unwrap();
        let path = PackageBuilder::new("demo", Version::new(2, 1, 0))
            .write_to(temp.path())
            .unwrap();
        assert!(path.ends_with("demo.2.1.0.keelpkg"));
        assert!(path.is_file());
    }
}
