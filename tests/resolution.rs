// Resolution integration tests
//
// The walker driven by a real directory feed: conflict reconciliation,
// determinism across publish order, and cycle termination, all through the
// same provider stack the restore path uses.

use keel_feed::{DirectoryFeed, Feed};
use keel_framework::FrameworkName;
use keel_store::PackageBuilder;
use keel_version::Version;
use keel_walker::{DependencyProvider, DependencyWalker, FeedProvider, WalkResult};
use std::path::Path;
use std::sync::Arc;

fn publish(dir: &Path, id: &str, version: &str, deps: &[(&str, &str)]) {
    let mut builder = PackageBuilder::new(id, Version::parse(version).unwrap());
    for (name, range) in deps {
        builder = builder.dependency(*name, *range);
    }
    builder
        .file(&format!("lib/keel45/{id}.klib"), b"x")
        .write_to(dir)
        .unwrap();
}

fn walk_feed(dir: &Path, root: &str, version: &str) -> WalkResult {
    let feed: Arc<dyn Feed> = Arc::new(DirectoryFeed::new(dir));
    let providers: Vec<Box<dyn DependencyProvider>> =
        vec![Box::new(FeedProvider::new(vec![feed]))];
    let walker = DependencyWalker::new(providers);
    walker
        .walk(
            root,
            &Version::parse(version).unwrap(),
            &FrameworkName::parse("keel45").unwrap(),
        )
        .unwrap()
}

fn names_and_versions(result: &WalkResult) -> Vec<String> {
    let mut out: Vec<String> = result
        .libraries
        .iter()
        .map(|l| format!("{}", l.identity))
        .collect();
    out.sort();
    out
}

#[test]
fn test_conflicting_requests_settle_on_one_version() {
    let temp = tempfile::tempdir().unwrap();
    publish(temp.path(), "root", "1.0.0", &[("left", "1.0.0"), ("right", "1.0.0")]);
    publish(temp.path(), "left", "1.0.0", &[("shared", "[1.0.0]")]);
    publish(temp.path(), "right", "1.0.0", &[("shared", "2.0.0")]);
    publish(temp.path(), "shared", "1.0.0", &[("old-extra", "1.0.0")]);
    publish(temp.path(), "shared", "2.0.0", &[("new-extra", "1.0.0")]);
    publish(temp.path(), "old-extra", "1.0.0", &[]);
    publish(temp.path(), "new-extra", "1.0.0", &[]);

    let result = walk_feed(temp.path(), "root", "1.0.0");
    assert!(result.warnings.is_empty());

    // The root-nearest request for "shared" arrives via "left", whose exact
    // pin [1.0.0] governs reconciliation: 1.0.0 wins, and only the winner's
    // subtree survives.
    let shared = result
        .libraries
        .iter()
        .find(|l| l.identity.name == "shared")
        .unwrap();
    assert_eq!(shared.identity.version, Version::new(1, 0, 0));
    assert!(result.libraries.iter().any(|l| l.identity.name == "old-extra"));
    assert!(!result.libraries.iter().any(|l| l.identity.name == "new-extra"));
}

#[test]
fn test_result_is_independent_of_publish_order() {
    let graph: &[(&str, &str, &[(&str, &str)])] = &[
        ("root", "1.0.0", &[("b", "1.0.0"), ("c", "1.0.0")]),
        ("b", "1.0.0", &[("shared", "1.5.0")]),
        ("c", "1.0.0", &[("shared", "1.0.0")]),
        ("shared", "1.0.0", &[]),
        ("shared", "1.5.0", &[]),
        ("shared", "2.0.0", &[]),
    ];

    let forward = tempfile::tempdir().unwrap();
    for (id, version, deps) in graph {
        publish(forward.path(), id, version, deps);
    }
    let backward = tempfile::tempdir().unwrap();
    for (id, version, deps) in graph.iter().rev() {
        publish(backward.path(), id, version, deps);
    }

    let first = walk_feed(forward.path(), "root", "1.0.0");
    let second = walk_feed(backward.path(), "root", "1.0.0");
    assert_eq!(names_and_versions(&first), names_and_versions(&second));

    // Both floors are minimum-inclusive, so the highest satisfying version
    // wins regardless of which path is seen first.
    assert!(names_and_versions(&first).contains(&"shared/2.0.0".to_string()));
}

#[test]
fn test_cycle_terminates_with_each_node_once() {
    let temp = tempfile::tempdir().unwrap();
    publish(temp.path(), "a", "1.0.0", &[("b", "1.0.0")]);
    publish(temp.path(), "b", "1.0.0", &[("c", "1.0.0")]);
    publish(temp.path(), "c", "1.0.0", &[("a", "1.0.0")]);

    let result = walk_feed(temp.path(), "a", "1.0.0");
    assert_eq!(result.libraries.len(), 3);
    assert!(result.libraries.iter().all(|l| l.resolved));
}

#[test]
fn test_unknown_root_is_unresolved_not_panic() {
    let temp = tempfile::tempdir().unwrap();
    let result = walk_feed(temp.path(), "absent", "1.0.0");
    assert_eq!(result.libraries.len(), 1);
    assert!(!result.libraries[0].resolved);
    assert_eq!(result.warnings.len(), 1);
}
