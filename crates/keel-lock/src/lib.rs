//! The persisted lock file.
//!
//! `keel.lock` records the fully resolved dependency graph per restore
//! target: which version of every library won, its content hash, its
//! dependency edges, and the asset files selected for the target. It is
//! rebuilt fresh on every restore; the previous lock is consulted only to
//! skip redundant hash computation and to detect manifest drift.

mod model;
mod reader;
mod writer;

pub use model::{
    LockFile, LockFileLibrary, LockFileTarget, LockFileTargetLibrary, LockLibraryKind,
};
pub use reader::read;
pub use writer::write;

use std::path::PathBuf;
use thiserror::Error;

/// The format version this reader and writer speak.
pub const CURRENT_VERSION: i64 = 2;

/// File name of the lock, next to the project manifest.
pub const LOCK_FILE_NAME: &str = "keel.lock";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed lock file '{path}': {reason}")]
    Format { path: PathBuf, reason: String },

    /// The lock exists but this reader does not understand its format.
    /// Callers decide whether to regenerate or fail.
    #[error("lock file '{path}' has unsupported version {found}")]
    UnsupportedVersion { path: PathBuf, found: i64 },

    #[error("inconsistent lock file '{path}': {reason}")]
    Inconsistent { path: PathBuf, reason: String },
}
