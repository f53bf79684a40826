//! Cross-process install locking.

use crate::StoreError;
use fs2::FileExt as _;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, OnceLock};

/// An exclusive lock on a package's archive path, shared safely across
/// processes.
///
/// The lock is an OS advisory file lock, so it is released automatically if
/// the holding process dies; a crashed installer can never wedge the shared
/// store for other processes. Dropping the guard releases it.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

/// Paths currently locked by this process. fs2 file locks are
/// process-scoped on Unix and do not exclude other threads of the same
/// process; this set closes that gap. An entry lives only while its lock is
/// held.
struct BusyPaths {
    paths: Mutex<HashSet<PathBuf>>,
    freed: Condvar,
}

fn busy_paths() -> &'static BusyPaths {
    static BUSY: OnceLock<BusyPaths> = OnceLock::new();
    BUSY.get_or_init(|| BusyPaths {
        paths: Mutex::new(HashSet::new()),
        freed: Condvar::new(),
    })
}

fn release(path: &Path) {
    let busy = busy_paths();
    let mut paths = busy
        .paths
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    paths.remove(path);
    busy.freed.notify_all();
}

impl InstallLock {
    /// Acquire an exclusive lock on `path`, creating the file (and parent
    /// directories) if needed. Blocks until the lock is available.
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        let busy = busy_paths();
        let mut paths = busy
            .paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while paths.contains(path) {
            paths = busy
                .freed
                .wait(paths)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        paths.insert(path.to_path_buf());
        drop(paths);

        // From here on, failing to take the file lock must free the entry.
        match Self::lock_file(path) {
            Ok(file) => Ok(Self {
                file,
                path: path.to_path_buf(),
            }),
            Err(e) => {
                release(path);
                Err(e)
            }
        }
    }

    fn lock_file(path: &Path) -> Result<File, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        release(&self.path);
    }
}
