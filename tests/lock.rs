// Lock file integration tests
//
// Write a fully-populated lock document to disk and read it back, plus the
// rejection paths: unsupported versions and internally inconsistent
// documents.

use keel_framework::FrameworkName;
use keel_lock::{
    LockError, LockFile, LockFileLibrary, LockFileTarget, LockFileTargetLibrary, LockLibraryKind,
};
use keel_version::Version;
use std::collections::BTreeMap;
use std::fs;

fn sample_lock() -> LockFile {
    let mut dependencies = BTreeMap::new();
    dependencies.insert("base".to_string(), Some("1.0.0".to_string()));
    // Version-range-free edge: must survive as JSON null.
    dependencies.insert("local-lib".to_string(), None);

    let mut lock = LockFile::new();
    lock.targets.push(LockFileTarget {
        framework: FrameworkName::parse("keel45").unwrap(),
        runtime_identifier: None,
        // Entries are kept in the writer's canonical order (lowercase name,
        // then version) so a write/read cycle compares equal structurally.
        libraries: vec![
            LockFileTargetLibrary {
                name: "base".to_string(),
                version: Version::new(1, 0, 0),
                kind: Some(LockLibraryKind::Package),
                ..Default::default()
            },
            LockFileTargetLibrary {
                name: "Json-Kit".to_string(),
                version: Version::new(1, 5, 0),
                kind: Some(LockLibraryKind::Package),
                dependencies,
                framework_assemblies: vec!["Keel.Core".to_string()],
                compile: vec!["lib/keel45/Json-Kit.klib".to_string()],
                runtime: vec!["lib/keel45/Json-Kit.klib".to_string()],
                resource: Vec::new(),
                native: Vec::new(),
            },
            LockFileTargetLibrary {
                name: "local-lib".to_string(),
                version: Version::new(0, 1, 0),
                kind: Some(LockLibraryKind::Project),
                ..Default::default()
            },
        ],
    });
    lock.libraries = vec![
        LockFileLibrary {
            name: "base".to_string(),
            version: Version::new(1, 0, 0),
            sha512: "YmFzZQ==".to_string(),
            kind: Some(LockLibraryKind::Package),
            files: vec!["manifest.json".to_string()],
            path: Some("base/1.0.0".to_string()),
        },
        LockFileLibrary {
            name: "Json-Kit".to_string(),
            version: Version::new(1, 5, 0),
            sha512: "c2lkZWNhcg==".to_string(),
            kind: Some(LockLibraryKind::Package),
            files: vec![
                "lib/keel45/Json-Kit.klib".to_string(),
                "manifest.json".to_string(),
            ],
            path: Some("Json-Kit/1.5.0".to_string()),
        },
        LockFileLibrary {
            name: "local-lib".to_string(),
            version: Version::new(0, 1, 0),
            sha512: String::new(),
            kind: Some(LockLibraryKind::Project),
            files: Vec::new(),
            path: Some("../local-lib/keel.json".to_string()),
        },
    ];
    lock.project_file_dependency_groups.insert(
        String::new(),
        vec![
            "json-kit >= [1.0.0, 2.0.0)".to_string(),
            "local-lib".to_string(),
        ],
    );
    lock
}

#[test]
fn test_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("keel.lock");
    let lock = sample_lock();

    keel_lock::write(&lock, &path).unwrap();
    let read_back = keel_lock::read(&path).unwrap();
    assert_eq!(read_back, lock);

    // The rangeless dependency is a literal null in the document.
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"local-lib\": null"));
    assert!(text.ends_with('\n'));
}

#[test]
fn test_rewrite_is_byte_stable() {
    let temp = tempfile::tempdir().unwrap();
    let first = temp.path().join("a.lock");
    let second = temp.path().join("b.lock");
    let lock = sample_lock();

    keel_lock::write(&lock, &first).unwrap();
    keel_lock::write(&keel_lock::read(&first).unwrap(), &second).unwrap();
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn test_unsupported_version() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("keel.lock");
    fs::write(&path, r#"{"version": 99, "targets": {}, "libraries": {}}"#).unwrap();
    match keel_lock::read(&path).unwrap_err() {
        LockError::UnsupportedVersion { found, .. } => assert_eq!(found, 99),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_dangling_target_library_is_inconsistent() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("keel.lock");
    let mut lock = sample_lock();
    // Drop an identity entry that a target still references.
    lock.libraries.retain(|l| l.name != "base");
    keel_lock::write(&lock, &path).unwrap();

    assert!(matches!(
        keel_lock::read(&path).unwrap_err(),
        LockError::Inconsistent { .. }
    ));
}

#[test]
fn test_malformed_document() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("keel.lock");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        keel_lock::read(&path).unwrap_err(),
        LockError::Format { .. }
    ));
}
