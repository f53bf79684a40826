// End-to-end restore tests
//
// Full pipeline over real directories: manifest -> walk -> install -> asset
// selection -> lock file, with a directory feed serving built archives.

use keel_lock::LockLibraryKind;
use keel_restore::{FeedSource, RestoreConfig, needs_restore, restore};
use keel_store::PackageBuilder;
use keel_manifest::ProjectManifest;
use keel_version::Version;
use std::fs;
use std::path::Path;

fn publish_graph(feed_dir: &Path) {
    // pkg-a pulls in pkg-b at the same floor. pkg-b stops at 1.5.0 so the
    // declared floor is also the highest published version.
    for version in ["1.0.0", "1.5.0", "2.0.0"] {
        PackageBuilder::new("pkg-a", Version::parse(version).unwrap())
            .dependency("pkg-b", version)
            .file("lib/keel45/pkg-a.klib", b"a45")
            .file("lib/keel40/pkg-a.klib", b"a40")
            .file("native/linux-x64/libpkga.so", b"native")
            .write_to(feed_dir)
            .unwrap();
        if version != "2.0.0" {
            PackageBuilder::new("pkg-b", Version::parse(version).unwrap())
                .file("lib/keel45/pkg-b.klib", b"b45")
                .write_to(feed_dir)
                .unwrap();
        }
    }
}

fn write_project(dir: &Path, range: &str) {
    fs::write(
        dir.join("keel.json"),
        format!(
            r#"{{
    "name": "app",
    "version": "0.1.0",
    "dependencies": {{ "pkg-a": "{range}" }},
    "frameworks": {{ "keel45": {{}} }}
}}
"#
        ),
    )
    .unwrap();
}

fn config(feed_dir: &Path, store_dir: &Path, cache_dir: &Path) -> RestoreConfig {
    RestoreConfig {
        package_roots: vec![store_dir.to_path_buf()],
        http_cache_root: cache_dir.to_path_buf(),
        sources: vec![FeedSource::Directory(feed_dir.to_path_buf())],
        ignore_failed_sources: false,
        bypass_http_cache: false,
        runtimes: vec!["linux-x64".to_string()],
    }
}

#[test]
fn test_restore_resolves_highest_satisfying_versions() {
    let feed = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    publish_graph(feed.path());
    write_project(project.path(), "[1.0.0, 2.0.0)");

    let summary = restore(
        project.path(),
        &config(feed.path(), store.path(), cache.path()),
    )
    .unwrap();
    assert!(summary.warnings.is_empty());
    assert_eq!(summary.installed, 2);
    assert!(summary.lock_path.is_file());

    let lock = keel_lock::read(&summary.lock_path).unwrap();
    assert_eq!(lock.targets.len(), 1);
    assert_eq!(lock.targets[0].key(), "keel45");

    // 1.5.0 is the highest pkg-a version inside the interval; 2.0.0 exists
    // but must not be chosen. pkg-a's bare "1.5.0" request for pkg-b is a
    // floor, and 1.5.0 is the highest published version above it.
    let keys: Vec<String> = lock.targets[0]
        .libraries
        .iter()
        .map(|l| l.key())
        .collect();
    assert_eq!(keys, vec!["pkg-a/1.5.0", "pkg-b/1.5.0"]);

    let a = &lock.targets[0].libraries[0];
    assert_eq!(a.kind, Some(LockLibraryKind::Package));
    assert_eq!(
        a.dependencies.get("pkg-b"),
        Some(&Some("1.5.0".to_string()))
    );
    // Asset selection: the nearest compatible framework group wins, and the
    // requested runtime's native payload is picked up.
    assert_eq!(a.compile, vec!["lib/keel45/pkg-a.klib"]);
    assert_eq!(a.runtime, vec!["lib/keel45/pkg-a.klib"]);
    assert_eq!(a.native, vec!["native/linux-x64/libpkga.so"]);

    let entry = lock
        .libraries
        .iter()
        .find(|l| l.key() == "pkg-a/1.5.0")
        .unwrap();
    assert!(!entry.sha512.is_empty());
    assert!(entry.files.contains(&"manifest.json".to_string()));
    assert_eq!(entry.path.as_deref(), Some("pkg-a/1.5.0"));

    // Both packages landed in the store.
    assert!(store.path().join("pkg-a/1.5.0/manifest.json").is_file());
    assert!(store.path().join("pkg-b/1.5.0/manifest.json").is_file());
    assert!(!store.path().join("pkg-a/2.0.0").exists());
}

#[test]
fn test_second_restore_is_stable_and_installs_nothing() {
    let feed = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    publish_graph(feed.path());
    write_project(project.path(), "[1.0.0, 2.0.0)");
    let config = config(feed.path(), store.path(), cache.path());

    let first = restore(project.path(), &config).unwrap();
    let first_bytes = fs::read_to_string(&first.lock_path).unwrap();

    let second = restore(project.path(), &config).unwrap();
    assert_eq!(second.installed, 0);
    assert!(second.warnings.is_empty());
    assert_eq!(fs::read_to_string(&second.lock_path).unwrap(), first_bytes);
}

#[test]
fn test_lock_drift_detection() {
    let feed = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    publish_graph(feed.path());
    write_project(project.path(), "[1.0.0, 2.0.0)");

    let summary = restore(
        project.path(),
        &config(feed.path(), store.path(), cache.path()),
    )
    .unwrap();
    let lock = keel_lock::read(&summary.lock_path).unwrap();

    let manifest = ProjectManifest::load(project.path()).unwrap();
    assert!(!needs_restore(&manifest, &lock));

    // Widen the declared range: the lock no longer reflects the manifest.
    write_project(project.path(), "[1.0.0, 3.0.0)");
    let drifted = ProjectManifest::load(project.path()).unwrap();
    assert!(needs_restore(&drifted, &lock));
}

#[test]
fn test_missing_dependency_completes_with_warnings() {
    let feed = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    publish_graph(feed.path());
    fs::write(
        project.path().join("keel.json"),
        r#"{
    "name": "app",
    "version": "0.1.0",
    "dependencies": { "ghost": "1.0.0" }
}
"#,
    )
    .unwrap();

    let summary = restore(
        project.path(),
        &config(feed.path(), store.path(), cache.path()),
    )
    .unwrap();
    assert!(summary.completed_with_warnings());
    assert!(summary.warnings.iter().any(|w| w.contains("ghost")));
    // The lock is still written; the unresolved node is simply absent.
    let lock = keel_lock::read(&summary.lock_path).unwrap();
    assert!(lock.targets[0].libraries.is_empty());
}

#[test]
fn test_package_level_missing_dependency_keeps_lock_readable() {
    let feed = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    // pkg-c's own dependency is absent from every source; the root itself
    // resolves fine.
    PackageBuilder::new("pkg-c", Version::parse("1.0.0").unwrap())
        .dependency("ghost", "1.0.0")
        .file("lib/keel45/pkg-c.klib", b"c45")
        .write_to(feed.path())
        .unwrap();
    fs::write(
        project.path().join("keel.json"),
        r#"{
    "name": "app",
    "version": "0.1.0",
    "dependencies": { "pkg-c": "1.0.0" },
    "frameworks": { "keel45": {} }
}
"#,
    )
    .unwrap();

    let summary = restore(
        project.path(),
        &config(feed.path(), store.path(), cache.path()),
    )
    .unwrap();
    assert!(summary.completed_with_warnings());
    assert!(summary.warnings.iter().any(|w| w.contains("ghost")));

    // The written lock must pass its own referential check: pkg-c is
    // present, its dangling edge is not.
    let lock = keel_lock::read(&summary.lock_path).unwrap();
    assert_eq!(lock.targets[0].libraries.len(), 1);
    let c = &lock.targets[0].libraries[0];
    assert_eq!(c.key(), "pkg-c/1.0.0");
    assert!(!c.dependencies.contains_key("ghost"));
}

#[test]
fn test_republished_package_is_rehashed_on_reinstall() {
    let feed = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    PackageBuilder::new("solo", Version::parse("1.0.0").unwrap())
        .file("lib/keel45/solo.klib", b"one")
        .write_to(feed.path())
        .unwrap();
    fs::write(
        project.path().join("keel.json"),
        r#"{
    "name": "app",
    "version": "0.1.0",
    "dependencies": { "solo": "1.0.0" },
    "frameworks": { "keel45": {} }
}
"#,
    )
    .unwrap();
    let config = config(feed.path(), store.path(), cache.path());

    let first = restore(project.path(), &config).unwrap();
    let old_hash = keel_lock::read(&first.lock_path).unwrap().libraries[0]
        .sha512
        .clone();

    // Same identity, new content; wipe the install so the next restore
    // pulls the republished archive.
    PackageBuilder::new("solo", Version::parse("1.0.0").unwrap())
        .file("lib/keel45/solo.klib", b"two")
        .write_to(feed.path())
        .unwrap();
    fs::remove_dir_all(store.path().join("solo")).unwrap();

    let second = restore(project.path(), &config).unwrap();
    assert_eq!(second.installed, 1);
    let new_hash = keel_lock::read(&second.lock_path).unwrap().libraries[0]
        .sha512
        .clone();
    // The fresh install's sidecar wins over the stale lock entry.
    assert_ne!(new_hash, old_hash);
}

#[test]
fn test_stale_lock_version_is_regenerated() {
    let feed = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    publish_graph(feed.path());
    write_project(project.path(), "[1.0.0, 2.0.0)");
    fs::write(
        project.path().join("keel.lock"),
        r#"{"version": 1, "targets": {}, "libraries": {}}"#,
    )
    .unwrap();

    let summary = restore(
        project.path(),
        &config(feed.path(), store.path(), cache.path()),
    )
    .unwrap();
    assert!(
        summary
            .warnings
            .iter()
            .any(|w| w.contains("unsupported version"))
    );
    let lock = keel_lock::read(&summary.lock_path).unwrap();
    assert_eq!(lock.version, keel_lock::CURRENT_VERSION);
    assert_eq!(lock.targets[0].libraries.len(), 2);
}
