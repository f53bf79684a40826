//! Per-framework restore scope.

use crate::RestoreError;
use keel_assets::{ContentItemCollection, PatternSet, SelectionCriteria};
use keel_feed::Feed;
use keel_framework::FrameworkName;
use keel_lock::{
    LockFile, LockFileLibrary, LockFileTarget, LockFileTargetLibrary, LockLibraryKind,
};
use keel_manifest::ProjectManifest;
use keel_store::{InstallOutcome, PackageStore, StorePathResolver};
use keel_version::Version;
use keel_walker::{
    DependencyProvider, DependencyWalker, FeedProvider, FrameworkReferenceProvider,
    LibraryDescription, LibraryKind, LockPinnedProvider, ProjectReferenceProvider,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// The output of restoring one framework.
pub struct FrameworkRestore {
    pub target: LockFileTarget,
    pub libraries: Vec<LockFileLibrary>,
    pub warnings: Vec<String>,
    pub installed: usize,
}

/// One framework's provider set, walker and asset selection.
///
/// Contexts are never shared across frameworks; only the feeds (with their
/// per-id memoization) and the on-disk store are.
pub struct RestoreContext<'a> {
    project: &'a ProjectManifest,
    framework: FrameworkName,
    feeds: Vec<Arc<dyn Feed>>,
    resolver: &'a StorePathResolver,
    previous_lock: Option<&'a LockFile>,
    runtimes: &'a [String],
}

impl<'a> RestoreContext<'a> {
    pub fn for_framework(
        project: &'a ProjectManifest,
        framework: FrameworkName,
        feeds: Vec<Arc<dyn Feed>>,
        resolver: &'a StorePathResolver,
        previous_lock: Option<&'a LockFile>,
        runtimes: &'a [String],
    ) -> Self {
        Self {
            project,
            framework,
            feeds,
            resolver,
            previous_lock,
            runtimes,
        }
    }

    pub fn run(self) -> Result<FrameworkRestore, RestoreError> {
        let walker = DependencyWalker::new(self.providers());
        let result = walker.walk(
            &self.project.name,
            &self.project.version,
            &self.framework,
        )?;

        let mut warnings = result.warnings.clone();
        if let Some(summary) = result.missing_dependencies_warning(&self.framework) {
            warnings.push(summary);
        }

        let mut target = LockFileTarget {
            framework: self.framework.clone(),
            runtime_identifier: None,
            libraries: Vec::new(),
        };
        let mut libraries = Vec::new();
        let mut installed = 0;

        // Names that will actually appear in this target. Dependency edges
        // to anything else (unresolved nodes, the root project) must not be
        // written, or the lock would fail its own referential check.
        let included: HashSet<String> = result
            .libraries
            .iter()
            .filter(|l| match l.kind {
                LibraryKind::Package => true,
                LibraryKind::Project => {
                    !l.identity.name.eq_ignore_ascii_case(&self.project.name)
                }
                LibraryKind::Framework | LibraryKind::Unresolved => false,
            })
            .map(|l| l.identity.name.to_ascii_lowercase())
            .collect();

        for library in &result.libraries {
            match library.kind {
                LibraryKind::Package => {
                    let (store, count) = self.ensure_installed(
                        &library.identity.name,
                        &library.identity.version,
                    )?;
                    installed += count;
                    let entry =
                        self.package_entries(library, store, count > 0, &included)?;
                    target.libraries.push(entry.0);
                    libraries.push(entry.1);
                }
                LibraryKind::Project => {
                    // The root project is the graph's entry point, not a
                    // locked library.
                    if library
                        .identity
                        .name
                        .eq_ignore_ascii_case(&self.project.name)
                    {
                        continue;
                    }
                    let (target_library, library_entry) =
                        project_entries(library, &included);
                    target.libraries.push(target_library);
                    libraries.push(library_entry);
                }
                // Framework references ride in their dependents'
                // frameworkAssemblies lists; unresolved nodes are warnings.
                LibraryKind::Framework | LibraryKind::Unresolved => {}
            }
        }

        Ok(FrameworkRestore {
            target,
            libraries,
            warnings,
            installed,
        })
    }

    fn providers(&self) -> Vec<Box<dyn DependencyProvider + 'a>> {
        let mut providers: Vec<Box<dyn DependencyProvider + 'a>> = vec![Box::new(
            ProjectReferenceProvider::new(vec![self.project.clone()]),
        )];
        // A locked lock file pins versions outright, but only while the
        // manifest it was generated from is unchanged.
        if let Some(lock) = self.previous_lock
            && lock.locked
            && lock.matches_dependency_groups(&self.project.dependency_groups())
        {
            providers.push(Box::new(LockPinnedProvider::new(lock.clone())));
        }
        providers.push(Box::new(FeedProvider::new(self.feeds.clone())));
        providers.push(Box::new(FrameworkReferenceProvider));
        providers
    }

    /// Make sure the package is present in some store root, installing from
    /// a feed into the primary root when it is not. Returns the store that
    /// holds it and how many installs this performed (0 or 1).
    fn ensure_installed(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<(&PackageStore, usize), RestoreError> {
        if let Some(store) = self.resolver.find_installed(name, version) {
            return Ok((store, 0));
        }

        for feed in &self.feeds {
            let Some(info) = feed
                .find_versions(name)?
                .into_iter()
                .find(|info| &info.version == version)
            else {
                continue;
            };
            let store = self
                .resolver
                .install_store()
                .ok_or(RestoreError::NoStoreRoot)?;
            let archive = feed.open_archive(&info)?;
            let (_, outcome) =
                store.install_from_stream(archive, Some((name, version)), None)?;
            let count = match outcome {
                InstallOutcome::Installed | InstallOutcome::Overwritten => 1,
                InstallOutcome::AlreadyInstalled => 0,
            };
            return Ok((store, count));
        }

        Err(RestoreError::PackageUnavailable {
            name: name.to_string(),
            version: version.clone(),
        })
    }

    /// Build the target-library and library entries for one package.
    fn package_entries(
        &self,
        library: &LibraryDescription,
        store: &PackageStore,
        freshly_installed: bool,
        included: &HashSet<String>,
    ) -> Result<(LockFileTargetLibrary, LockFileLibrary), RestoreError> {
        let name = &library.identity.name;
        let version = &library.identity.version;

        // The previous lock's hash is reused for an unchanged identity so an
        // up-to-date restore does no hash work. A package installed during
        // this restore may have new content under the same identity, so its
        // sidecar is authoritative.
        let previous = if freshly_installed {
            None
        } else {
            self.previous_lock
                .and_then(|lock| lock.previous_hash(name, version))
        };
        let sha512 = match previous {
            Some(hash) => hash.to_string(),
            None => store.read_hash(name, version)?,
        };

        let files = store.package_files(name, version)?;
        let collection = ContentItemCollection::new(files.clone());
        let criteria = SelectionCriteria::for_target(&self.framework, self.runtimes);
        let native_criteria = SelectionCriteria::for_runtime(self.runtimes);

        let select = |pattern_set: &PatternSet, criteria: &SelectionCriteria| {
            collection
                .find_best_item_group(criteria, pattern_set)
                .map(|group| group.items.into_iter().map(|item| item.path).collect())
                .unwrap_or_default()
        };

        let mut dependencies = BTreeMap::new();
        let mut framework_assemblies = Vec::new();
        for dependency in &library.dependencies {
            if dependency.range.is_framework_reference {
                framework_assemblies.push(dependency.range.name.clone());
            } else if included.contains(&dependency.range.name.to_ascii_lowercase()) {
                dependencies.insert(
                    dependency.range.name.clone(),
                    dependency.range.range.as_ref().map(|r| r.to_string()),
                );
            }
            // Edges to unresolved nodes are dropped; the walker has already
            // warned about them.
        }

        let target_library = LockFileTargetLibrary {
            name: name.clone(),
            version: version.clone(),
            kind: Some(LockLibraryKind::Package),
            dependencies,
            framework_assemblies,
            compile: select(&PatternSet::compile_assemblies(), &criteria),
            runtime: select(&PatternSet::runtime_assemblies(), &criteria),
            resource: select(&PatternSet::resource_assemblies(), &criteria),
            native: select(&PatternSet::native_libraries(), &native_criteria),
        };
        let library_entry = LockFileLibrary {
            name: name.clone(),
            version: version.clone(),
            sha512,
            kind: Some(LockLibraryKind::Package),
            files,
            path: Some(format!("{name}/{version}")),
        };
        Ok((target_library, library_entry))
    }
}

fn project_entries(
    library: &LibraryDescription,
    included: &HashSet<String>,
) -> (LockFileTargetLibrary, LockFileLibrary) {
    let mut dependencies = BTreeMap::new();
    for dependency in &library.dependencies {
        if !dependency.range.is_framework_reference
            && included.contains(&dependency.range.name.to_ascii_lowercase())
        {
            dependencies.insert(
                dependency.range.name.clone(),
                dependency.range.range.as_ref().map(|r| r.to_string()),
            );
        }
    }
    let target_library = LockFileTargetLibrary {
        name: library.identity.name.clone(),
        version: library.identity.version.clone(),
        kind: Some(LockLibraryKind::Project),
        dependencies,
        ..Default::default()
    };
    let library_entry = LockFileLibrary {
        name: library.identity.name.clone(),
        version: library.identity.version.clone(),
        sha512: String::new(),
        kind: Some(LockLibraryKind::Project),
        files: Vec::new(),
        path: library
            .path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
    };
    (target_library, library_entry)
}
