//! The project manifest (`keel.json`).

use crate::ManifestError;
use keel_framework::FrameworkName;
use keel_version::{Version, VersionRange};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the project manifest.
pub const PROJECT_MANIFEST_NAME: &str = "keel.json";

/// What kind of library a declared dependency may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyTarget {
    /// Any provider may satisfy it (the default).
    #[default]
    Any,
    /// Only a project reference.
    Project,
    /// Only a package.
    Package,
}

/// A single declared dependency.
#[derive(Debug, Clone)]
pub struct ProjectDependency {
    pub name: String,
    /// `None` means "version-range-free" (wildcard / project reference).
    pub range: Option<VersionRange>,
    pub target: DependencyTarget,
}

impl ProjectDependency {
    /// The raw spec string as persisted into the lockfile's
    /// `projectFileDependencyGroups` (used for drift detection).
    pub fn spec_string(&self) -> String {
        match &self.range {
            Some(range) => format!("{} >= {}", self.name, range),
            None => self.name.clone(),
        }
    }
}

/// On-disk shape of a dependency value: either a bare range string or an
/// object with optional fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Simple(String),
    Detailed {
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        target: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawFrameworkSection {
    #[serde(default)]
    dependencies: BTreeMap<String, RawDependency>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, RawDependency>,
    #[serde(default)]
    frameworks: BTreeMap<String, RawFrameworkSection>,
}

/// A parsed project manifest.
#[derive(Debug, Clone)]
pub struct ProjectManifest {
    pub name: String,
    pub version: Version,
    pub path: PathBuf,
    /// Dependencies declared for every framework.
    pub dependencies: Vec<ProjectDependency>,
    /// Additional dependencies per target framework.
    pub frameworks: BTreeMap<FrameworkName, Vec<ProjectDependency>>,
}

impl ProjectManifest {
    /// Load `keel.json` from `path` (a file or a directory containing one).
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = if path.is_dir() {
            path.join(PROJECT_MANIFEST_NAME)
        } else {
            path.to_path_buf()
        };
        let text = fs::read_to_string(&file).map_err(|source| ManifestError::Io {
            path: file.clone(),
            source,
        })?;
        Self::parse(&text, &file)
    }

    /// Parse manifest text. `path` is used for error context and for deriving
    /// a project name when the manifest does not declare one.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ManifestError> {
        let raw: RawProject = serde_json::from_str(text).map_err(|source| ManifestError::Format {
            path: path.to_path_buf(),
            source,
        })?;

        let name = raw.name.unwrap_or_else(|| {
            path.parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".to_string())
        });

        let version = match raw.version {
            Some(v) => Version::parse(&v).map_err(|source| ManifestError::Version {
                path: path.to_path_buf(),
                source,
            })?,
            None => Version::new(1, 0, 0),
        };

        let dependencies = convert_dependencies(raw.dependencies, path)?;

        let mut frameworks = BTreeMap::new();
        for (token, section) in raw.frameworks {
            let framework =
                FrameworkName::parse(&token).map_err(|source| ManifestError::Framework {
                    path: path.to_path_buf(),
                    source,
                })?;
            frameworks.insert(framework, convert_dependencies(section.dependencies, path)?);
        }

        Ok(Self {
            name,
            version,
            path: path.to_path_buf(),
            dependencies,
            frameworks,
        })
    }

    /// The target frameworks this project declares. A project with no
    /// framework sections still restores once, against a caller-chosen
    /// default framework.
    pub fn target_frameworks(&self) -> Vec<&FrameworkName> {
        self.frameworks.keys().collect()
    }

    /// All dependencies in effect for `framework`: the unconditional group
    /// plus that framework's own group.
    pub fn dependencies_for(&self, framework: &FrameworkName) -> Vec<&ProjectDependency> {
        let mut all: Vec<&ProjectDependency> = self.dependencies.iter().collect();
        if let Some(extra) = self.frameworks.get(framework) {
            all.extend(extra.iter());
        }
        all
    }

    /// The raw dependency groups as persisted into the lockfile: the empty
    /// string keys the unconditional group, each framework token keys its
    /// own. Used for manifest/lock drift detection.
    pub fn dependency_groups(&self) -> BTreeMap<String, Vec<String>> {
        let mut groups = BTreeMap::new();
        groups.insert(
            String::new(),
            self.dependencies.iter().map(|d| d.spec_string()).collect(),
        );
        for (framework, deps) in &self.frameworks {
            groups.insert(
                framework.to_string(),
                deps.iter().map(|d| d.spec_string()).collect(),
            );
        }
        groups
    }
}

fn convert_dependencies(
    raw: BTreeMap<String, RawDependency>,
    path: &Path,
) -> Result<Vec<ProjectDependency>, ManifestError> {
    let mut out = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        let (version, target) = match value {
            RawDependency::Simple(v) => (Some(v), None),
            RawDependency::Detailed { version, target } => (version, target),
        };

        let range = match version.as_deref() {
            Some("") | None => None,
            Some(text) => Some(VersionRange::parse(text).map_err(|source| {
                ManifestError::Version {
                    path: path.to_path_buf(),
                    source,
                }
            })?),
        };

        let target = match target.as_deref() {
            Some("project") => DependencyTarget::Project,
            Some("package") => DependencyTarget::Package,
            _ => DependencyTarget::Any,
        };

        out.push(ProjectDependency {
            name,
            range,
            target,
        });
    }
    Ok(out)
}
