//! Dependency providers.
//!
//! A provider answers one question: can this range be resolved to a concrete
//! library, and what does that library in turn depend on? Providers are
//! consulted in priority order (project references, lock-pinned entries,
//! package feeds, framework references); the first one that yields a
//! candidate wins for the provider layer. Cross-path version reconciliation
//! is the walker's job, not theirs.

use crate::library::{
    LibraryDependency, LibraryDescription, LibraryIdentity, LibraryKind, LibraryRange,
};
use crate::WalkError;
use keel_feed::{Feed, PackageInfo, manifest_from_feed};
use keel_framework::FrameworkName;
use keel_lock::{LockFile, LockLibraryKind};
use keel_manifest::ProjectManifest;
use keel_version::{Version, VersionRange};
use std::sync::Arc;

pub trait DependencyProvider {
    /// Whether this provider handles ranges of this shape at all.
    fn supports(&self, range: &LibraryRange) -> bool;

    /// Resolve `range` for `framework`, or `None` when this provider has no
    /// candidate. Errors are real failures (I/O, malformed manifests), not
    /// "not found".
    fn resolve(
        &self,
        range: &LibraryRange,
        framework: &FrameworkName,
    ) -> Result<Option<LibraryDescription>, WalkError>;
}

/// Resolves references to sibling projects by manifest name.
pub struct ProjectReferenceProvider {
    projects: Vec<ProjectManifest>,
}

impl ProjectReferenceProvider {
    pub fn new(projects: Vec<ProjectManifest>) -> Self {
        Self { projects }
    }
}

impl DependencyProvider for ProjectReferenceProvider {
    fn supports(&self, range: &LibraryRange) -> bool {
        !range.is_framework_reference
    }

    fn resolve(
        &self,
        range: &LibraryRange,
        framework: &FrameworkName,
    ) -> Result<Option<LibraryDescription>, WalkError> {
        let Some(project) = self
            .projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(&range.name))
        else {
            return Ok(None);
        };

        let dependencies = project
            .dependencies_for(framework)
            .into_iter()
            .map(|dep| {
                LibraryDependency::unresolved(LibraryRange {
                    name: dep.name.clone(),
                    range: dep.range.clone(),
                    is_framework_reference: false,
                })
            })
            .collect();

        Ok(Some(LibraryDescription {
            identity: LibraryIdentity {
                name: project.name.clone(),
                version: project.version.clone(),
                is_framework_reference: false,
            },
            kind: LibraryKind::Project,
            path: Some(project.path.clone()),
            dependencies,
            assemblies: Vec::new(),
            framework: framework.clone(),
            resolved: true,
        }))
    }
}

/// Resolves from a previous lock file when it is marked `locked`: the
/// recorded versions are authoritative and feeds are not consulted.
pub struct LockPinnedProvider {
    lock: LockFile,
}

impl LockPinnedProvider {
    pub fn new(lock: LockFile) -> Self {
        Self { lock }
    }
}

impl DependencyProvider for LockPinnedProvider {
    fn supports(&self, range: &LibraryRange) -> bool {
        self.lock.locked && !range.is_framework_reference
    }

    fn resolve(
        &self,
        range: &LibraryRange,
        framework: &FrameworkName,
    ) -> Result<Option<LibraryDescription>, WalkError> {
        let Some(target) = self
            .lock
            .targets
            .iter()
            .find(|t| &t.framework == framework && t.runtime_identifier.is_none())
        else {
            return Ok(None);
        };
        let Some(entry) = target
            .libraries
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(&range.name))
        else {
            return Ok(None);
        };

        let mut dependencies = Vec::new();
        for (name, dep_range) in &entry.dependencies {
            let parsed = match dep_range {
                Some(text) => Some(VersionRange::parse(text)?),
                None => None,
            };
            dependencies.push(LibraryDependency::unresolved(LibraryRange::new(
                name.clone(),
                parsed,
            )));
        }

        let kind = match entry.kind {
            Some(LockLibraryKind::Project) => LibraryKind::Project,
            _ => LibraryKind::Package,
        };
        Ok(Some(LibraryDescription {
            identity: LibraryIdentity {
                name: entry.name.clone(),
                version: entry.version.clone(),
                is_framework_reference: false,
            },
            kind,
            path: None,
            dependencies,
            assemblies: entry.compile.clone(),
            framework: framework.clone(),
            resolved: true,
        }))
    }
}

/// Resolves from package feeds, choosing the best candidate version across
/// all of them. Feeds are shared (their per-id memoization spans every
/// framework of one restore), the provider itself is per-framework.
pub struct FeedProvider {
    feeds: Vec<Arc<dyn Feed>>,
}

impl FeedProvider {
    pub fn new(feeds: Vec<Arc<dyn Feed>>) -> Self {
        Self { feeds }
    }

    /// The best (feed, version) pair for a range across every feed, by the
    /// same preference policy the walker uses for cross-path conflicts.
    fn pick(
        &self,
        name: &str,
        range: Option<&VersionRange>,
    ) -> Result<Option<(&dyn Feed, PackageInfo)>, WalkError> {
        let mut best: Option<(&dyn Feed, PackageInfo)> = None;
        for feed in &self.feeds {
            for info in feed.find_versions(name)? {
                let better = match (&best, range) {
                    (None, _) => true,
                    (Some((_, current)), Some(range)) => {
                        range.is_better_match(Some(&current.version), &info.version)
                    }
                    (Some((_, current)), None) => info.version > current.version,
                };
                if better {
                    best = Some((feed.as_ref(), info));
                }
            }
        }
        Ok(best)
    }
}

impl DependencyProvider for FeedProvider {
    fn supports(&self, range: &LibraryRange) -> bool {
        !range.is_framework_reference
    }

    fn resolve(
        &self,
        range: &LibraryRange,
        framework: &FrameworkName,
    ) -> Result<Option<LibraryDescription>, WalkError> {
        let Some((feed, info)) = self.pick(&range.name, range.range.as_ref())? else {
            return Ok(None);
        };

        let manifest = manifest_from_feed(feed, &info)?;
        let mut dependencies: Vec<LibraryDependency> = manifest
            .dependencies_for(framework)?
            .into_iter()
            .map(|(name, dep_range)| {
                LibraryDependency::unresolved(LibraryRange::new(name, dep_range))
            })
            .collect();
        for assembly in manifest.framework_assemblies_for(framework) {
            dependencies.push(LibraryDependency::unresolved(LibraryRange {
                name: assembly.to_string(),
                range: None,
                is_framework_reference: true,
            }));
        }

        Ok(Some(LibraryDescription {
            identity: LibraryIdentity {
                // The package's own manifest is authoritative for casing.
                name: manifest.id.clone(),
                version: manifest.version.clone(),
                is_framework_reference: false,
            },
            kind: LibraryKind::Package,
            path: None,
            dependencies,
            assemblies: Vec::new(),
            framework: framework.clone(),
            resolved: true,
        }))
    }
}

/// Terminal provider for framework assembly references: always resolves,
/// never recurses.
pub struct FrameworkReferenceProvider;

impl DependencyProvider for FrameworkReferenceProvider {
    fn supports(&self, range: &LibraryRange) -> bool {
        range.is_framework_reference
    }

    fn resolve(
        &self,
        range: &LibraryRange,
        framework: &FrameworkName,
    ) -> Result<Option<LibraryDescription>, WalkError> {
        let version = range
            .range
            .as_ref()
            .and_then(|r| r.min.clone())
            .unwrap_or_default();
        Ok(Some(LibraryDescription {
            identity: LibraryIdentity {
                name: range.name.clone(),
                version,
                is_framework_reference: true,
            },
            kind: LibraryKind::Framework,
            path: None,
            dependencies: Vec::new(),
            assemblies: Vec::new(),
            framework: framework.clone(),
            resolved: true,
        }))
    }
}
