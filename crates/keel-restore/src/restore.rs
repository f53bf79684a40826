//! The restore operation.

use crate::context::{FrameworkRestore, RestoreContext};
use crate::{RestoreConfig, RestoreError};
use keel_feed::Feed;
use keel_framework::FrameworkName;
use keel_lock::{LOCK_FILE_NAME, LockError, LockFile};
use keel_manifest::{PROJECT_MANIFEST_NAME, ProjectManifest};
use keel_store::StorePathResolver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Framework assumed when a manifest declares none.
pub const DEFAULT_FRAMEWORK: &str = "keel45";

/// What a restore accomplished.
#[derive(Debug)]
pub struct RestoreSummary {
    pub warnings: Vec<String>,
    /// Packages newly installed (or overwritten) in the store.
    pub installed: usize,
    pub lock_path: PathBuf,
}

impl RestoreSummary {
    /// Restores with unresolved dependencies or ignored sources succeed but
    /// carry warnings; callers signal this distinctly from hard failure.
    pub fn completed_with_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Whether the lock no longer reflects the manifest's declared dependencies.
pub fn needs_restore(project: &ProjectManifest, lock: &LockFile) -> bool {
    !lock.matches_dependency_groups(&project.dependency_groups())
}

/// Restore a project: resolve its full graph per framework, install missing
/// packages, and write `keel.lock` next to the manifest.
pub fn restore(project_path: &Path, config: &RestoreConfig) -> Result<RestoreSummary, RestoreError> {
    let manifest_path = if project_path.is_dir() {
        project_path.join(PROJECT_MANIFEST_NAME)
    } else {
        project_path.to_path_buf()
    };
    let project = ProjectManifest::load(&manifest_path)?;
    let lock_path = manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(LOCK_FILE_NAME);

    let mut warnings = Vec::new();
    let previous = read_previous_lock(&lock_path, &mut warnings)?;

    let resolver = StorePathResolver::open(&config.package_roots)?;
    let feeds = config.build_feeds()?;
    let shared_feeds: Vec<Arc<dyn Feed>> = feeds
        .iter()
        .map(|feed| Arc::clone(feed) as Arc<dyn Feed>)
        .collect();

    let mut frameworks: Vec<FrameworkName> =
        project.target_frameworks().into_iter().cloned().collect();
    if frameworks.is_empty() {
        frameworks.push(FrameworkName::parse(DEFAULT_FRAMEWORK)?);
    }

    // Frameworks restore independently: no shared graph state, one walker
    // and provider set each, over the same store and feeds.
    let mut outcomes: Vec<Result<FrameworkRestore, RestoreError>> =
        Vec::with_capacity(frameworks.len());
    thread::scope(|scope| {
        let handles: Vec<_> = frameworks
            .iter()
            .map(|framework| {
                let context = RestoreContext::for_framework(
                    &project,
                    framework.clone(),
                    shared_feeds.clone(),
                    &resolver,
                    previous.as_ref(),
                    &config.runtimes,
                );
                scope.spawn(move || context.run())
            })
            .collect();
        for handle in handles {
            outcomes.push(
                handle
                    .join()
                    .unwrap_or_else(|_| Err(RestoreError::WorkerPanicked)),
            );
        }
    });

    let mut lock = LockFile::new();
    lock.project_file_dependency_groups = project.dependency_groups();
    let mut installed = 0;
    for outcome in outcomes {
        let framework_restore = outcome?;
        installed += framework_restore.installed;
        for warning in framework_restore.warnings {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
        lock.targets.push(framework_restore.target);
        for library in framework_restore.libraries {
            let exists = lock.libraries.iter().any(|l| {
                l.name.eq_ignore_ascii_case(&library.name) && l.version == library.version
            });
            if !exists {
                lock.libraries.push(library);
            }
        }
    }

    for feed in &feeds {
        if feed.was_ignored() {
            warnings.push(format!(
                "Source '{}' was ignored after repeated failures",
                feed.name()
            ));
        }
    }

    keel_lock::write(&lock, &lock_path)?;
    Ok(RestoreSummary {
        warnings,
        installed,
        lock_path,
    })
}

/// A previous lock is an optimization, not a requirement: a missing one is
/// normal, an unreadable-by-design one (unsupported version, inconsistent
/// references) is regenerated with a warning, and only a malformed document
/// is a hard error.
fn read_previous_lock(
    lock_path: &Path,
    warnings: &mut Vec<String>,
) -> Result<Option<LockFile>, RestoreError> {
    if !lock_path.is_file() {
        return Ok(None);
    }
    match keel_lock::read(lock_path) {
        Ok(lock) => Ok(Some(lock)),
        Err(LockError::UnsupportedVersion { found, .. }) => {
            warnings.push(format!(
                "Ignoring lock file with unsupported version {found}; it will be regenerated"
            ));
            Ok(None)
        }
        Err(LockError::Inconsistent { reason, .. }) => {
            warnings.push(format!(
                "Ignoring inconsistent lock file ({reason}); it will be regenerated"
            ));
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
