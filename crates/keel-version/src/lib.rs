//! Version and version-range semantics for Keel.
//!
//! This crate is pure data: parsing, ordering and constraint satisfaction.
//! It performs no I/O, so every other crate can depend on it freely.

mod range;
mod version;

pub use range::{FloatBehavior, VersionRange};
pub use version::Version;

use thiserror::Error;

/// Errors produced while parsing versions or version ranges.
#[derive(Debug, Clone, Error)]
pub enum VersionError {
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    #[error("invalid version range '{0}': {1}")]
    InvalidRange(String, String),
}
