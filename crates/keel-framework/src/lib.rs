//! Target framework names and compatibility rules for Keel.
//!
//! A target framework (tfm) names the runtime/API surface a project compiles
//! against. Asset selection and lock targets are always framework-specific,
//! so this crate provides the parsing, compatibility and "nearest framework"
//! logic shared by the walker, the asset matcher and the lockfile.

mod name;
mod target;

pub use name::FrameworkName;
pub use target::TargetKey;

use thiserror::Error;

/// A runtime identifier: a platform/architecture tag used to select
/// platform-specific assets. Opaque to the core; callers supply the
/// acceptable identifiers in most-specific-first order.
pub type RuntimeIdentifier = String;

/// Errors produced while parsing framework names or target keys.
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    #[error("invalid framework name '{0}'")]
    InvalidName(String),

    #[error("invalid target key '{0}'")]
    InvalidTargetKey(String),
}
