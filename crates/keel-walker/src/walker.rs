//! The graph walk.

use crate::library::{LibraryDescription, LibraryIdentity, LibraryRange};
use crate::provider::DependencyProvider;
use crate::WalkError;
use keel_framework::FrameworkName;
use keel_version::{Version, VersionRange};
use std::collections::{HashMap, HashSet, VecDeque};

/// Re-expansions tolerated per library before the walker gives up on
/// reconciling it further. Candidate sets only grow, so the fixed point is
/// reached well before this in practice.
const MAX_REEXPANSIONS: u32 = 16;

/// Everything the walker has learned about one library name.
#[derive(Default)]
struct Tracked {
    /// The root-nearest range, fixed at first sight; the winner is always
    /// judged against this one.
    first_range: Option<VersionRange>,
    /// Distinct resolved candidates, one per version.
    candidates: Vec<LibraryDescription>,
    /// Placeholder kept when no provider could satisfy some range.
    unresolved: Option<LibraryDescription>,
    winner: Option<Version>,
    reexpansions: u32,
}

impl Tracked {
    fn winning_description(&self) -> Option<&LibraryDescription> {
        let winner = self.winner.as_ref()?;
        self.candidates
            .iter()
            .find(|c| &c.identity.version == winner)
    }
}

/// The flat output of one walk.
#[derive(Debug, Clone)]
pub struct WalkResult {
    pub libraries: Vec<LibraryDescription>,
    pub warnings: Vec<String>,
}

impl WalkResult {
    /// A single human-readable summary of everything that failed to
    /// resolve, or `None` when the graph is complete.
    pub fn missing_dependencies_warning(&self, framework: &FrameworkName) -> Option<String> {
        let missing: Vec<String> = self
            .libraries
            .iter()
            .filter(|l| !l.resolved)
            .map(|l| l.identity.name.clone())
            .collect();
        if missing.is_empty() {
            return None;
        }
        Some(format!(
            "Dependencies missing for {}: {}",
            framework,
            missing.join(", ")
        ))
    }
}

/// Walks a project's transitive closure, reconciling version conflicts.
pub struct DependencyWalker<'a> {
    providers: Vec<Box<dyn DependencyProvider + 'a>>,
}

impl<'a> DependencyWalker<'a> {
    /// Providers in priority order.
    pub fn new(providers: Vec<Box<dyn DependencyProvider + 'a>>) -> Self {
        Self { providers }
    }

    pub fn walk(
        &self,
        root_name: &str,
        root_version: &Version,
        framework: &FrameworkName,
    ) -> Result<WalkResult, WalkError> {
        let mut tracked: HashMap<String, Tracked> = HashMap::new();
        let mut queue: VecDeque<LibraryRange> = VecDeque::new();
        let mut expanded: HashSet<(String, Version)> = HashSet::new();
        let mut resolution_cache: HashMap<(String, String), Option<LibraryDescription>> =
            HashMap::new();
        let mut warnings: Vec<String> = Vec::new();

        let root_key = track_key(root_name, false);
        queue.push_back(LibraryRange::new(
            root_name,
            Some(VersionRange::exact(root_version.clone())),
        ));

        while let Some(range) = queue.pop_front() {
            let key = track_key(&range.name, range.is_framework_reference);
            let entry = tracked.entry(key.clone()).or_default();
            if entry.first_range.is_none() {
                // Breadth-first order makes the first-seen range the
                // root-nearest one.
                entry.first_range = range.range.clone();
            }

            let cache_key = (
                key.clone(),
                range.range.as_ref().map(|r| r.to_string()).unwrap_or_default(),
            );
            let description = match resolution_cache.get(&cache_key) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = self.resolve(&range, framework)?;
                    resolution_cache.insert(cache_key, resolved.clone());
                    resolved
                }
            };

            let entry = tracked.entry(key.clone()).or_default();
            let Some(description) = description else {
                let warning = format!("Unable to locate {} for {}", range, framework);
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
                if entry.unresolved.is_none() {
                    entry.unresolved =
                        Some(LibraryDescription::unresolved(&range, framework));
                }
                continue;
            };

            if !entry
                .candidates
                .iter()
                .any(|c| c.identity.version == description.identity.version)
            {
                entry.candidates.push(description);
            }

            // Reconcile: the winner is the best candidate for the
            // root-nearest range, recomputed whenever candidates change.
            let new_winner = select_winner(entry);
            let changed = entry.winner != new_winner;
            if changed && entry.winner.is_some() {
                entry.reexpansions += 1;
                if entry.reexpansions > MAX_REEXPANSIONS {
                    let warning = format!(
                        "Version reconciliation for '{}' did not settle; keeping {}",
                        range.name,
                        entry.winner.as_ref().map(|v| v.to_string()).unwrap_or_default()
                    );
                    if !warnings.contains(&warning) {
                        warnings.push(warning);
                    }
                    continue;
                }
            }
            entry.winner = new_winner;

            // Expand the winner once per (name, version); a winner change
            // re-expands the new version from scratch rather than reusing
            // the evicted one's edges.
            if let Some(winner) = entry.winning_description() {
                let marker = (key.clone(), winner.identity.version.clone());
                let dependencies: Vec<LibraryRange> = winner
                    .dependencies
                    .iter()
                    .map(|d| d.range.clone())
                    .collect();
                if expanded.insert(marker) {
                    for dependency in dependencies {
                        queue.push_back(dependency);
                    }
                }
            }
        }

        Ok(assemble(&tracked, &root_key, warnings))
    }

    fn resolve(
        &self,
        range: &LibraryRange,
        framework: &FrameworkName,
    ) -> Result<Option<LibraryDescription>, WalkError> {
        for provider in &self.providers {
            if !provider.supports(range) {
                continue;
            }
            if let Some(description) = provider.resolve(range, framework)? {
                return Ok(Some(description));
            }
        }
        Ok(None)
    }
}

fn track_key(name: &str, is_framework_reference: bool) -> String {
    if is_framework_reference {
        format!("fx:{}", name.to_ascii_lowercase())
    } else {
        name.to_ascii_lowercase()
    }
}

fn select_winner(entry: &Tracked) -> Option<Version> {
    let mut best: Option<&Version> = None;
    for candidate in &entry.candidates {
        let version = &candidate.identity.version;
        let better = match (&entry.first_range, best) {
            (_, None) => true,
            (Some(range), Some(current)) => range.is_better_match(Some(current), version),
            (None, Some(current)) => version > current,
        };
        if better {
            best = Some(version);
        }
    }
    best.cloned()
}

/// Collect the winning descriptions reachable from the root, filling in each
/// edge's resolved identity. Evicted candidates and orphaned subtrees fall
/// away here.
fn assemble(
    tracked: &HashMap<String, Tracked>,
    root_key: &str,
    warnings: Vec<String>,
) -> WalkResult {
    let mut libraries = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(root_key.to_string());
    visited.insert(root_key.to_string());

    while let Some(key) = queue.pop_front() {
        let Some(entry) = tracked.get(&key) else {
            continue;
        };
        let Some(description) = entry.winning_description().or(entry.unresolved.as_ref())
        else {
            continue;
        };

        let mut description = description.clone();
        for dependency in &mut description.dependencies {
            let dep_key = track_key(
                &dependency.range.name,
                dependency.range.is_framework_reference,
            );
            if let Some(dep_entry) = tracked.get(&dep_key) {
                dependency.resolved = dep_entry
                    .winning_description()
                    .or(dep_entry.unresolved.as_ref())
                    .map(|d| d.identity.clone());
            }
            if visited.insert(dep_key.clone()) {
                queue.push_back(dep_key);
            }
        }
        libraries.push(description);
    }

    WalkResult {
        libraries,
        warnings,
    }
}
