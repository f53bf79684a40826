//! Lock file data model.

use keel_framework::{FrameworkName, TargetKey};
use keel_version::Version;
use std::collections::BTreeMap;
use std::fmt;

/// What produced a locked library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockLibraryKind {
    Package,
    Project,
}

impl LockLibraryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockLibraryKind::Package => "package",
            LockLibraryKind::Project => "project",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "package" => Some(LockLibraryKind::Package),
            "project" => Some(LockLibraryKind::Project),
            _ => None,
        }
    }
}

impl fmt::Display for LockLibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The whole lock document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LockFile {
    pub version: i64,
    pub locked: bool,
    pub targets: Vec<LockFileTarget>,
    pub libraries: Vec<LockFileLibrary>,
    /// Raw dependency-spec strings as declared in the manifest, keyed by
    /// framework token (empty string for the unconditional group). Used for
    /// drift detection between manifest and lock.
    pub project_file_dependency_groups: BTreeMap<String, Vec<String>>,
}

impl LockFile {
    pub fn new() -> Self {
        Self {
            version: crate::CURRENT_VERSION,
            ..Default::default()
        }
    }

    /// The stored hash for a library, used to skip re-hashing an install
    /// whose identity is unchanged since the previous restore.
    pub fn previous_hash(&self, name: &str, version: &Version) -> Option<&str> {
        self.libraries
            .iter()
            .find(|lib| lib.name.eq_ignore_ascii_case(name) && &lib.version == version)
            .map(|lib| lib.sha512.as_str())
            .filter(|hash| !hash.is_empty())
    }

    /// Whether the lock was produced from exactly these declared dependency
    /// groups. A mismatch means the manifest changed since the last restore.
    pub fn matches_dependency_groups(&self, groups: &BTreeMap<String, Vec<String>>) -> bool {
        &self.project_file_dependency_groups == groups
    }
}

/// One restore target: a framework, optionally narrowed by runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct LockFileTarget {
    pub framework: FrameworkName,
    pub runtime_identifier: Option<String>,
    pub libraries: Vec<LockFileTargetLibrary>,
}

impl LockFileTarget {
    /// The composite key this target serializes under.
    pub fn key(&self) -> String {
        TargetKey {
            framework: self.framework.clone(),
            runtime: self.runtime_identifier.clone(),
        }
        .to_string()
    }
}

/// One library as seen from a target: its edges and selected assets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LockFileTargetLibrary {
    pub name: String,
    pub version: Version,
    pub kind: Option<LockLibraryKind>,
    /// Dependency name to range string; `None` is a version-range-free
    /// dependency (project reference or wildcard) and must round-trip as
    /// such.
    pub dependencies: BTreeMap<String, Option<String>>,
    pub framework_assemblies: Vec<String>,
    pub compile: Vec<String>,
    pub runtime: Vec<String>,
    pub resource: Vec<String>,
    pub native: Vec<String>,
}

impl LockFileTargetLibrary {
    pub fn key(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

/// One library's identity entry: content hash and full file list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LockFileLibrary {
    pub name: String,
    pub version: Version,
    pub sha512: String,
    pub kind: Option<LockLibraryKind>,
    pub files: Vec<String>,
    pub path: Option<String>,
}

impl LockFileLibrary {
    pub fn key(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}
