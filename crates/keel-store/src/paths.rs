//! Store path layout and multi-root resolution.

use crate::{ARCHIVE_EXTENSION, HASH_EXTENSION, PACKAGE_MANIFEST_NAME, StoreError};
use keel_version::Version;
use std::fs;
use std::path::{Path, PathBuf};

/// A single package store root.
///
/// Layout per package:
///
/// ```text
/// {root}/{name}/{version}/
///     manifest.json
///     {name}.{version}.keelpkg
///     {name}.{version}.keelpkg.sha512     <- completeness signal
///     lib/..., runtimes/..., native/...   <- extracted payload
/// ```
///
/// `name` is case-preserving as spelled by the package's own manifest, never
/// as requested by a caller.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Open (and create if missing) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The install directory for a package.
    pub fn install_path(&self, name: &str, version: &Version) -> PathBuf {
        self.root.join(name).join(version.to_string())
    }

    /// The extracted manifest path.
    pub fn manifest_path(&self, name: &str, version: &Version) -> PathBuf {
        self.install_path(name, version).join(PACKAGE_MANIFEST_NAME)
    }

    /// The archive path.
    pub fn archive_path(&self, name: &str, version: &Version) -> PathBuf {
        self.install_path(name, version)
            .join(format!("{}.{}.{}", name, version, ARCHIVE_EXTENSION))
    }

    /// The content-hash sidecar path.
    pub fn hash_path(&self, name: &str, version: &Version) -> PathBuf {
        let mut path = self.archive_path(name, version).into_os_string();
        path.push(".");
        path.push(HASH_EXTENSION);
        PathBuf::from(path)
    }

    /// Whether an install is complete. Sidecar presence is the sole signal;
    /// a half-written directory without one counts as not installed.
    pub fn is_installed(&self, name: &str, version: &Version) -> bool {
        self.hash_path(name, version).is_file()
    }

    /// Read the stored content hash of an installed package.
    pub fn read_hash(&self, name: &str, version: &Version) -> Result<String, StoreError> {
        let path = self.hash_path(name, version);
        if !path.is_file() {
            return Err(StoreError::NotInstalled(self.install_path(name, version)));
        }
        Ok(fs::read_to_string(&path)?.trim().to_string())
    }

    /// Recompute the archive hash and compare it with the sidecar.
    /// `false` means the install is stale or corrupt.
    pub fn verify(&self, name: &str, version: &Version) -> Result<bool, StoreError> {
        let stored = self.read_hash(name, version)?;
        let file = fs::File::open(self.archive_path(name, version))?;
        let actual = crate::hash_reader(file)?;
        Ok(stored == actual)
    }

    /// Relative paths of every file in a completed install, sorted. The
    /// archive and its sidecar are bookkeeping, not payload, and are left
    /// out.
    pub fn package_files(&self, name: &str, version: &Version) -> Result<Vec<String>, StoreError> {
        let root = self.install_path(name, version);
        if !self.is_installed(name, version) {
            return Err(StoreError::NotInstalled(root));
        }
        let skip = [
            self.archive_path(name, version),
            self.hash_path(name, version),
        ];

        let mut out = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    stack.push(path);
                } else if !skip.contains(&path)
                    && let Ok(relative) = path.strip_prefix(&root)
                {
                    out.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        Ok(out)
    }

    /// Enumerate completed installs as (name, version) pairs, sorted.
    pub fn installed_packages(&self) -> Result<Vec<(String, Version)>, StoreError> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for name_entry in fs::read_dir(&self.root)? {
            let name_entry = name_entry?;
            if !name_entry.file_type()?.is_dir() {
                continue;
            }
            let name = name_entry.file_name().to_string_lossy().into_owned();
            for version_entry in fs::read_dir(name_entry.path())? {
                let version_entry = version_entry?;
                let Ok(version) = Version::parse(&version_entry.file_name().to_string_lossy())
                else {
                    continue;
                };
                if self.is_installed(&name, &version) {
                    out.push((name.clone(), version));
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Read-side resolution across an ordered list of store roots.
///
/// Reads consult each root in order; installs always go to the first. This
/// is how a per-user cache can shadow a machine-wide one.
#[derive(Debug, Clone)]
pub struct StorePathResolver {
    stores: Vec<PackageStore>,
}

impl StorePathResolver {
    /// Build a resolver from ordered roots. At least one root is required.
    pub fn open(roots: &[PathBuf]) -> Result<Self, StoreError> {
        let mut stores = Vec::with_capacity(roots.len());
        for root in roots {
            stores.push(PackageStore::open(root.clone())?);
        }
        Ok(Self { stores })
    }

    /// The store new installs are written to.
    pub fn install_store(&self) -> Option<&PackageStore> {
        self.stores.first()
    }

    /// The first store holding a completed install of the package.
    pub fn find_installed(&self, name: &str, version: &Version) -> Option<&PackageStore> {
        self.stores
            .iter()
            .find(|s| s.is_installed(name, version))
    }

    pub fn stores(&self) -> &[PackageStore] {
        &self.stores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let temp = tempfile::tempdir().unwrap();
        let store = PackageStore::open(temp.path()).unwrap();
        let v = Version::new(1, 2, 3);

        let install = store.install_path("Json-Kit", &v);
        assert!(install.ends_with("Json-Kit/1.2.3"));
        assert!(
            store
                .archive_path("Json-Kit", &v)
                .ends_with("Json-Kit/1.2.3/Json-Kit.1.2.3.keelpkg")
        );
        assert!(
            store
                .hash_path("Json-Kit", &v)
                .to_string_lossy()
                .ends_with(".keelpkg.sha512")
        );
    }

    #[test]
    fn test_not_installed_without_sidecar() {
        let temp = tempfile::tempdir().unwrap();
        let store = PackageStore::open(temp.path()).unwrap();
        let v = Version::new(1, 0, 0);

        // Even a populated directory does not count without the sidecar.
        fs::create_dir_all(store.install_path("pkg", &v)).unwrap();
        fs::write(store.manifest_path("pkg", &v), "{}").unwrap();
        assert!(!store.is_installed("pkg", &v));

        fs::write(store.hash_path("pkg", &v), "abc").unwrap();
        assert!(store.is_installed("pkg", &v));
    }

    #[test]
    fn test_resolver_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let resolver = StorePathResolver::open(&[
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ])
        .unwrap();

        let v = Version::new(1, 0, 0);
        let back = PackageStore::open(second.path()).unwrap();
        fs::create_dir_all(back.install_path("pkg", &v)).unwrap();
        fs::write(back.hash_path("pkg", &v), "h").unwrap();

        let found = resolver.find_installed("pkg", &v).unwrap();
        assert_eq!(found.root(), second.path());
        assert_eq!(resolver.install_store().unwrap().root(), first.path());
    }
}
