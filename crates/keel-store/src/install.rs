//! Package installation.

use crate::{
    InstallLock, PACKAGE_MANIFEST_NAME, PackageStore, StoreError, hash_bytes,
};
use flate2::read::GzDecoder;
use keel_manifest::PackageManifest;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// The three user-visible results of an install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The package was not present and has been extracted.
    Installed,
    /// A different install of the same identity was replaced.
    Overwritten,
    /// An identical install already existed; nothing was written. Detecting
    /// that another process finished the same install while this one waited
    /// on the lock lands here too.
    AlreadyInstalled,
}

impl PackageStore {
    /// Install a package from an archive stream.
    ///
    /// The stream must be a gzip-compressed tar archive containing a
    /// `manifest.json` entry; the identity spelled in that manifest is
    /// authoritative for the install directory's casing. `expected`, when
    /// given, is checked case-insensitively against the manifest and guards
    /// against a feed serving the wrong payload. `precomputed_hash` skips
    /// re-hashing when the caller already knows the SHA-512.
    ///
    /// Write ordering is the crash-safety contract: payload, manifest
    /// rewrite, archive, then the hash sidecar last. Readers treat sidecar
    /// presence as the only completeness signal.
    pub fn install_from_stream<R: Read>(
        &self,
        mut reader: R,
        expected: Option<(&str, &keel_version::Version)>,
        precomputed_hash: Option<String>,
    ) -> Result<(PackageManifest, InstallOutcome), StoreError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let manifest = read_archive_manifest(&bytes)?;
        if let Some((name, version)) = expected
            && (!manifest.id.eq_ignore_ascii_case(name) || manifest.version != *version)
        {
            return Err(StoreError::IdentityMismatch {
                expected: format!("{}/{}", name, version),
                actual: format!("{}/{}", manifest.id, manifest.version),
            });
        }

        let hash = precomputed_hash.unwrap_or_else(|| hash_bytes(&bytes));

        let name = manifest.id.as_str();
        let version = manifest.version.clone();
        let archive_path = self.archive_path(name, &version);
        let hash_path = self.hash_path(name, &version);

        // Serializes concurrent installs of this package across processes;
        // released on every exit path by the guard's Drop.
        let _lock = InstallLock::acquire(&archive_path)?;

        // Re-check under the lock: another process may have completed the
        // identical install while we waited.
        let install_dir = self.install_path(name, &version);
        let outcome = match fs::read_to_string(&hash_path) {
            Ok(existing) if existing.trim() == hash => {
                return Ok((manifest, InstallOutcome::AlreadyInstalled));
            }
            Ok(_) => {
                // Different content for the same identity: invalidate the
                // completeness signal first, then clear the old payload so
                // files absent from the new archive do not survive.
                fs::remove_file(&hash_path)?;
                clear_install_dir(&install_dir, &archive_path)?;
                InstallOutcome::Overwritten
            }
            Err(_) => InstallOutcome::Installed,
        };

        extract_payload(&bytes, &install_dir)?;

        // Case fixup: rewrite the manifest in canonical form so the install
        // directory and manifest always agree.
        fs::write(
            self.manifest_path(name, &version),
            manifest.to_json()?,
        )?;

        fs::write(&archive_path, &bytes)?;

        // Sidecar last: its presence is the sole "install complete" signal.
        fs::write(&hash_path, &hash)?;

        Ok((manifest, outcome))
    }

    /// Install from an archive file on disk.
    pub fn install_from_file(
        &self,
        path: &Path,
        expected: Option<(&str, &keel_version::Version)>,
    ) -> Result<(PackageManifest, InstallOutcome), StoreError> {
        let file = File::open(path)?;
        self.install_from_stream(file, expected, None)
    }
}

/// Remove a prior install's contents, keeping the archive file: it carries
/// the advisory install lock, and unlinking a locked file would let another
/// process take a fresh lock on the same path.
fn clear_install_dir(dir: &Path, keep: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path == keep {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Locate and parse the manifest entry without extracting anything.
fn read_archive_manifest(bytes: &[u8]) -> Result<PackageManifest, StoreError> {
    let decoder = GzDecoder::new(io::Cursor::new(bytes));
    let mut archive = Archive::new(decoder);
    for entry in archive.entries()? {
        let entry = entry?;
        let path = entry.path()?;
        if path.as_os_str() == PACKAGE_MANIFEST_NAME {
            return Ok(PackageManifest::from_reader(
                entry,
                Path::new(PACKAGE_MANIFEST_NAME),
            )?);
        }
    }
    Err(StoreError::MissingManifest {
        expected: PACKAGE_MANIFEST_NAME.to_string(),
    })
}

/// Extract payload entries into the install directory.
///
/// Non-payload entries are skipped: signature files (`*.sig`) and anything
/// under `_meta/`. Entries that would escape the destination are skipped
/// outright.
fn extract_payload(bytes: &[u8], dest: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dest)?;

    let decoder = GzDecoder::new(io::Cursor::new(bytes));
    let mut archive = Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        if !is_payload_entry(&path) {
            continue;
        }
        let Some(safe) = sanitize(&path) else {
            continue;
        };

        let target = dest.join(safe);
        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

fn is_payload_entry(path: &Path) -> bool {
    if path.extension().is_some_and(|e| e == "sig") {
        return false;
    }
    !matches!(
        path.components().next(),
        Some(Component::Normal(first)) if first == "_meta"
    )
}

/// Reject absolute paths and parent-directory escapes.
fn sanitize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() { None } else { Some(out) }
}
