//! The package manifest (`manifest.json` inside a package archive).

use crate::ManifestError;
use keel_framework::FrameworkName;
use keel_version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A group of dependencies, optionally scoped to a framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDependencySet {
    /// `None` applies to every framework.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<FrameworkName>,
    /// Dependency name to range text. An empty string means rangeless.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// A framework assembly shipped by the platform rather than the package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkAssembly {
    pub assembly: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<FrameworkName>,
}

/// The package's own manifest. The `id` spelled here is authoritative for
/// casing; callers must prefer it over whatever casing they requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_sets: Vec<PackageDependencySet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub framework_assemblies: Vec<FrameworkAssembly>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl PackageManifest {
    /// Parse a manifest from a reader (typically an archive entry).
    pub fn from_reader<R: Read>(mut reader: R, path: &Path) -> Result<Self, ManifestError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&text, path)
    }

    /// Parse manifest text. `path` is error context only.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ManifestError> {
        serde_json::from_str(text).map_err(|source| ManifestError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a manifest from a file on disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// The dependencies that apply when consuming this package from
    /// `framework`: the nearest framework-specific set if any matches,
    /// otherwise the frameworkless set. A malformed range is a format error,
    /// not a rangeless dependency.
    pub fn dependencies_for(
        &self,
        framework: &FrameworkName,
    ) -> Result<Vec<(String, Option<VersionRange>)>, ManifestError> {
        let specific: Vec<&FrameworkName> = self
            .dependency_sets
            .iter()
            .filter_map(|s| s.framework.as_ref())
            .collect();
        let nearest = FrameworkName::nearest(framework, specific.into_iter());

        let chosen = match nearest {
            Some(near) => self
                .dependency_sets
                .iter()
                .find(|s| s.framework.as_ref() == Some(near)),
            None => self.dependency_sets.iter().find(|s| s.framework.is_none()),
        };

        let Some(set) = chosen else {
            return Ok(Vec::new());
        };
        set.dependencies
            .iter()
            .map(|(name, text)| {
                let range = if text.is_empty() {
                    None
                } else {
                    Some(VersionRange::parse(text).map_err(|source| {
                        ManifestError::Range {
                            package: self.id.clone(),
                            dependency: name.clone(),
                            source,
                        }
                    })?)
                };
                Ok((name.clone(), range))
            })
            .collect()
    }

    /// Framework assemblies applicable to `framework`.
    pub fn framework_assemblies_for(&self, framework: &FrameworkName) -> Vec<&str> {
        self.framework_assemblies
            .iter()
            .filter(|fa| {
                fa.framework
                    .as_ref()
                    .is_none_or(|fw| fw.is_compatible_with(framework))
            })
            .map(|fa| fa.assembly.as_str())
            .collect()
    }

    /// Serialize back to canonical JSON (used by the store's case fixup).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The canonical install directory name for this manifest.
    pub fn install_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.id).join(self.version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "Json-Kit",
        "version": "1.5.0",
        "dependencySets": [
            { "dependencies": { "base-lib": "1.0.0" } },
            { "framework": "keel45", "dependencies": { "legacy-shim": "2.0.0" } }
        ],
        "frameworkAssemblies": [
            { "assembly": "System.Runtime", "framework": "keel45" }
        ],
        "references": ["lib/keel45/Json-Kit.klib"]
    }"#;

    #[test]
    fn test_parse() {
        let m = PackageManifest::parse(SAMPLE, Path::new("manifest.json")).unwrap();
        assert_eq!(m.id, "Json-Kit");
        assert_eq!(m.version, Version::new(1, 5, 0));
        assert_eq!(m.dependency_sets.len(), 2);
    }

    #[test]
    fn test_framework_specific_set_wins() {
        let m = PackageManifest::parse(SAMPLE, Path::new("manifest.json")).unwrap();
        let keel45 = FrameworkName::parse("keel45").unwrap();
        let deps = m.dependencies_for(&keel45).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0, "legacy-shim");
    }

    #[test]
    fn test_fallback_to_frameworkless_set() {
        let m = PackageManifest::parse(SAMPLE, Path::new("manifest.json")).unwrap();
        let core = FrameworkName::parse("keelcore1.0").unwrap();
        let deps = m.dependencies_for(&core).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0, "base-lib");
    }

    #[test]
    fn test_malformed_range_is_an_error() {
        let m = PackageManifest::parse(
            r#"{
                "id": "broken",
                "version": "1.0.0",
                "dependencySets": [
                    { "dependencies": { "base-lib": "[1.0.0" } }
                ]
            }"#,
            Path::new("manifest.json"),
        )
        .unwrap();
        let err = m
            .dependencies_for(&FrameworkName::parse("keel45").unwrap())
            .unwrap_err();
        match err {
            ManifestError::Range { dependency, .. } => assert_eq!(dependency, "base-lib"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_roundtrip() {
        let m = PackageManifest::parse(SAMPLE, Path::new("manifest.json")).unwrap();
        let json = m.to_json().unwrap();
        let again = PackageManifest::parse(&json, Path::new("manifest.json")).unwrap();
        assert_eq!(again.id, m.id);
        assert_eq!(again.dependency_sets.len(), m.dependency_sets.len());
    }
}
