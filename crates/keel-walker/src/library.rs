//! Graph node and edge types.

use keel_framework::FrameworkName;
use keel_version::{Version, VersionRange};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// A resolved library: a unique (name, version) pair. Name equality is
/// case-insensitive; the stored casing is whatever the authoritative source
/// (a package's own manifest) declared.
#[derive(Debug, Clone, Eq)]
pub struct LibraryIdentity {
    pub name: String,
    pub version: Version,
    pub is_framework_reference: bool,
}

impl PartialEq for LibraryIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.version == other.version
    }
}

impl Hash for LibraryIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// A request for a library, not yet resolved. Many ranges across the graph
/// may resolve to the same identity.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryRange {
    pub name: String,
    pub range: Option<VersionRange>,
    pub is_framework_reference: bool,
}

impl LibraryRange {
    pub fn new(name: impl Into<String>, range: Option<VersionRange>) -> Self {
        Self {
            name: name.into(),
            range,
            is_framework_reference: false,
        }
    }
}

impl fmt::Display for LibraryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{} >= {}", self.name, range),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An edge in the dependency graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryDependency {
    pub range: LibraryRange,
    pub resolved: Option<LibraryIdentity>,
}

impl LibraryDependency {
    pub fn unresolved(range: LibraryRange) -> Self {
        Self {
            range,
            resolved: None,
        }
    }
}

/// What kind of node a description is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    Project,
    Package,
    Framework,
    Unresolved,
}

/// A resolved (or unresolvable) graph node produced by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryDescription {
    pub identity: LibraryIdentity,
    pub kind: LibraryKind,
    pub path: Option<PathBuf>,
    pub dependencies: Vec<LibraryDependency>,
    pub assemblies: Vec<String>,
    pub framework: FrameworkName,
    pub resolved: bool,
}

impl LibraryDescription {
    /// The placeholder node recorded when no provider can satisfy a range.
    pub fn unresolved(range: &LibraryRange, framework: &FrameworkName) -> Self {
        let version = range
            .range
            .as_ref()
            .and_then(|r| r.min.clone())
            .unwrap_or_default();
        Self {
            identity: LibraryIdentity {
                name: range.name.clone(),
                version,
                is_framework_reference: range.is_framework_reference,
            },
            kind: LibraryKind::Unresolved,
            path: None,
            dependencies: Vec::new(),
            assemblies: Vec::new(),
            framework: framework.clone(),
            resolved: false,
        }
    }
}
