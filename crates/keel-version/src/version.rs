//! Package version numbers.

use crate::VersionError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A package version: `major.minor.patch` with an optional prerelease tag.
///
/// Versions order numerically on the three components; a prerelease version
/// orders below the corresponding release (`1.0.0-beta < 1.0.0`). Prerelease
/// tags compare by plain byte order, which is stable even if not fully
/// semver-faithful for numeric identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl Version {
    /// Create a release version.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Attach a prerelease tag.
    pub fn with_prerelease(mut self, tag: impl Into<String>) -> Self {
        self.prerelease = Some(tag.into());
        self
    }

    /// Parse a version string.
    ///
    /// Accepts one to three dot-separated numeric components, with an
    /// optional `-tag` prerelease suffix. Missing components default to zero,
    /// so `"1.2"` parses as `1.2.0`.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VersionError::InvalidVersion(text.to_string()));
        }

        let (numbers, prerelease) = match text.split_once('-') {
            Some((n, tag)) if !tag.is_empty() => (n, Some(tag.to_string())),
            Some(_) => return Err(VersionError::InvalidVersion(text.to_string())),
            None => (text, None),
        };

        let mut parts = [0u64; 3];
        let mut count = 0;
        for piece in numbers.split('.') {
            if count >= 3 {
                return Err(VersionError::InvalidVersion(text.to_string()));
            }
            parts[count] = piece
                .parse()
                .map_err(|_| VersionError::InvalidVersion(text.to_string()))?;
            count += 1;
        }
        if count == 0 {
            return Err(VersionError::InvalidVersion(text.to_string()));
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            prerelease,
        })
    }

    /// Whether this is a prerelease version.
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The numeric triple without the prerelease tag.
    pub fn release(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release().cmp(&other.release()).then_with(|| {
            // A release outranks any prerelease of the same triple.
            match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(tag) = &self.prerelease {
            write!(f, "-{}", tag)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Version::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_short() {
        assert_eq!(Version::parse("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(Version::parse("2").unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn test_parse_prerelease() {
        let v = Version::parse("1.0.0-beta-2").unwrap();
        assert_eq!(v.prerelease.as_deref(), Some("beta-2"));
        assert_eq!(v.release(), (1, 0, 0));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("1.0.0-").is_err());
    }

    #[test]
    fn test_ordering() {
        let a = Version::parse("1.0.0").unwrap();
        let b = Version::parse("1.0.1").unwrap();
        let pre = Version::parse("1.0.1-alpha").unwrap();
        assert!(a < b);
        assert!(pre < b);
        assert!(a < pre);
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["1.2.3", "1.0.0-rc1"] {
            let v = Version::parse(text).unwrap();
            assert_eq!(v.to_string(), text);
        }
    }
}
