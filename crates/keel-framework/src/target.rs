//! Composite lock-target keys.

use crate::{FrameworkError, FrameworkName, RuntimeIdentifier};
use std::fmt;
use std::str::FromStr;

/// The key a lockfile target is stored under: `framework` or
/// `framework/runtime-identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub framework: FrameworkName,
    pub runtime: Option<RuntimeIdentifier>,
}

impl TargetKey {
    pub fn new(framework: FrameworkName) -> Self {
        Self {
            framework,
            runtime: None,
        }
    }

    pub fn with_runtime(framework: FrameworkName, runtime: impl Into<String>) -> Self {
        Self {
            framework,
            runtime: Some(runtime.into()),
        }
    }

    /// Parse a `framework[/rid]` key.
    pub fn parse(text: &str) -> Result<Self, FrameworkError> {
        let (fw, rid) = match text.split_once('/') {
            Some((fw, rid)) if !rid.is_empty() => (fw, Some(rid.to_string())),
            Some(_) => return Err(FrameworkError::InvalidTargetKey(text.to_string())),
            None => (text, None),
        };
        let framework =
            FrameworkName::parse(fw).map_err(|_| FrameworkError::InvalidTargetKey(text.to_string()))?;
        Ok(Self {
            framework,
            runtime: rid,
        })
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.runtime {
            Some(rid) => write!(f, "{}/{}", self.framework, rid),
            None => write!(f, "{}", self.framework),
        }
    }
}

impl FromStr for TargetKey {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_only() {
        let key = TargetKey::parse("keel45").unwrap();
        assert!(key.runtime.is_none());
        assert_eq!(key.to_string(), "keel45");
    }

    #[test]
    fn test_with_runtime() {
        let key = TargetKey::parse("keel45/linux-x64").unwrap();
        assert_eq!(key.runtime.as_deref(), Some("linux-x64"));
        assert_eq!(key.to_string(), "keel45/linux-x64");
    }

    #[test]
    fn test_invalid() {
        assert!(TargetKey::parse("keel45/").is_err());
        assert!(TargetKey::parse("bogus/linux-x64").is_err());
    }
}
