// Package store integration tests
//
// Exercise the install lifecycle end to end: archive in, payload extracted,
// hash sidecar written last, and the multi-root resolver reading across
// stores.

use keel_store::{InstallOutcome, PackageBuilder, PackageStore, StorePathResolver};
use keel_version::Version;
use std::fs;

fn archive(id: &str, version: &str) -> Vec<u8> {
    PackageBuilder::new(id, Version::parse(version).unwrap())
        .dependency("base", "1.0.0")
        .file(&format!("lib/keel45/{id}.klib"), b"assembly bytes")
        .build()
        .unwrap()
}

#[test]
fn test_install_and_reinstall() {
    let temp = tempfile::tempdir().unwrap();
    let store = PackageStore::open(temp.path()).unwrap();
    let bytes = archive("Json-Kit", "1.2.0");

    let (manifest, outcome) = store.install_from_stream(&bytes[..], None, None).unwrap();
    assert_eq!(outcome, InstallOutcome::Installed);
    assert_eq!(manifest.id, "Json-Kit");
    assert!(store.is_installed("Json-Kit", &Version::new(1, 2, 0)));

    // A second install of identical content writes nothing.
    let sidecar = store.hash_path("Json-Kit", &Version::new(1, 2, 0));
    let before = fs::metadata(&sidecar).unwrap().modified().unwrap();
    let (_, outcome) = store.install_from_stream(&bytes[..], None, None).unwrap();
    assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
    let after = fs::metadata(&sidecar).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_partial_install_is_invisible() {
    let temp = tempfile::tempdir().unwrap();
    let store = PackageStore::open(temp.path()).unwrap();
    let version = Version::new(1, 0, 0);

    // Simulate a crash after payload extraction but before the sidecar: the
    // install directory exists, the completeness signal does not.
    let dir = store.install_path("half", &version);
    fs::create_dir_all(dir.join("lib/keel45")).unwrap();
    fs::write(dir.join("lib/keel45/half.klib"), b"partial").unwrap();

    assert!(!store.is_installed("half", &version));
    assert!(store.installed_packages().unwrap().is_empty());

    // A real install over the debris completes normally.
    let (_, outcome) = store
        .install_from_stream(&archive("half", "1.0.0")[..], None, None)
        .unwrap();
    assert_eq!(outcome, InstallOutcome::Installed);
    assert!(store.is_installed("half", &version));
}

#[test]
fn test_verify_detects_tampering() {
    let temp = tempfile::tempdir().unwrap();
    let store = PackageStore::open(temp.path()).unwrap();
    store
        .install_from_stream(&archive("demo", "1.0.0")[..], None, None)
        .unwrap();
    let version = Version::new(1, 0, 0);
    assert!(store.verify("demo", &version).unwrap());

    fs::write(store.archive_path("demo", &version), b"garbage").unwrap();
    assert!(!store.verify("demo", &version).unwrap());
}

#[test]
fn test_package_files_lists_payload_only() {
    let temp = tempfile::tempdir().unwrap();
    let store = PackageStore::open(temp.path()).unwrap();
    let bytes = PackageBuilder::new("multi", Version::new(1, 0, 0))
        .file("lib/keel45/multi.klib", b"a")
        .file("lib/keel40/multi.klib", b"b")
        .file("runtimes/linux-x64/lib/keel45/multi.klib", b"c")
        .build()
        .unwrap();
    store.install_from_stream(&bytes[..], None, None).unwrap();

    let files = store.package_files("multi", &Version::new(1, 0, 0)).unwrap();
    assert_eq!(
        files,
        vec![
            "lib/keel40/multi.klib",
            "lib/keel45/multi.klib",
            "manifest.json",
            "runtimes/linux-x64/lib/keel45/multi.klib",
        ]
    );
    // The archive and its sidecar are bookkeeping, not payload.
    assert!(!files.iter().any(|f| f.ends_with(".keelpkg")));
    assert!(!files.iter().any(|f| f.ends_with(".sha512")));
}

#[test]
fn test_resolver_reads_all_roots_installs_to_first() {
    let primary = tempfile::tempdir().unwrap();
    let fallback = tempfile::tempdir().unwrap();

    // Seed the fallback root directly.
    let seed = PackageStore::open(fallback.path()).unwrap();
    seed.install_from_stream(&archive("shared", "2.0.0")[..], None, None)
        .unwrap();

    let resolver = StorePathResolver::open(&[
        primary.path().to_path_buf(),
        fallback.path().to_path_buf(),
    ])
    .unwrap();

    let found = resolver
        .find_installed("shared", &Version::new(2, 0, 0))
        .unwrap();
    assert_eq!(found.root(), fallback.path());

    let install = resolver.install_store().unwrap();
    assert_eq!(install.root(), primary.path());
    install
        .install_from_stream(&archive("fresh", "1.0.0")[..], None, None)
        .unwrap();
    assert!(primary.path().join("fresh/1.0.0").is_dir());
    assert!(!fallback.path().join("fresh").exists());
}
