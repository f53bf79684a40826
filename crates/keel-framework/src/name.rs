//! Framework name parsing and compatibility.

use crate::FrameworkError;
use keel_version::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A parsed target framework name.
///
/// Compact tokens pack the version into trailing digits (`keel45` is
/// identifier `keel`, version 4.5; `keel451` is 4.5.1); dotted tokens spell
/// it out (`keelcore1.0`). Identifiers compare case-insensitively.
#[derive(Debug, Clone, Eq)]
pub struct FrameworkName {
    pub identifier: String,
    pub version: Version,
}

impl FrameworkName {
    pub fn new(identifier: impl Into<String>, version: Version) -> Self {
        Self {
            identifier: identifier.into(),
            version,
        }
    }

    /// Parse a framework token.
    pub fn parse(text: &str) -> Result<Self, FrameworkError> {
        let text = text.trim();
        let split = text
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| FrameworkError::InvalidName(text.to_string()))?;
        if split == 0 {
            return Err(FrameworkError::InvalidName(text.to_string()));
        }

        let identifier = &text[..split];
        let digits = &text[split..];

        let version = if digits.contains('.') {
            Version::parse(digits).map_err(|_| FrameworkError::InvalidName(text.to_string()))?
        } else {
            // Compact form: one component per digit.
            let mut parts = [0u64; 3];
            if digits.len() > 3 || digits.is_empty() {
                return Err(FrameworkError::InvalidName(text.to_string()));
            }
            for (i, c) in digits.chars().enumerate() {
                parts[i] = c
                    .to_digit(10)
                    .ok_or_else(|| FrameworkError::InvalidName(text.to_string()))?
                    as u64;
            }
            Version::new(parts[0], parts[1], parts[2])
        };

        Ok(Self {
            identifier: identifier.to_string(),
            version,
        })
    }

    /// Whether an asset built for `self` can be consumed by a project
    /// targeting `target`: same identifier, and no newer than the target.
    pub fn is_compatible_with(&self, target: &FrameworkName) -> bool {
        self.identifier.eq_ignore_ascii_case(&target.identifier) && self.version <= target.version
    }

    /// Pick the candidate nearest to `target`: the highest compatible one.
    pub fn nearest<'a, I>(target: &FrameworkName, candidates: I) -> Option<&'a FrameworkName>
    where
        I: IntoIterator<Item = &'a FrameworkName>,
    {
        let mut best: Option<&FrameworkName> = None;
        for candidate in candidates {
            if !candidate.is_compatible_with(target) {
                continue;
            }
            if best.is_none_or(|b| candidate.version > b.version) {
                best = Some(candidate);
            }
        }
        best
    }

    /// The compact token form (`keel45` when all components are single
    /// digits, otherwise dotted).
    pub fn token(&self) -> String {
        let v = &self.version;
        if v.major < 10 && v.minor < 10 && v.patch < 10 && v.prerelease.is_none() {
            if v.patch > 0 {
                format!("{}{}{}{}", self.identifier, v.major, v.minor, v.patch)
            } else {
                format!("{}{}{}", self.identifier, v.major, v.minor)
            }
        } else {
            format!("{}{}", self.identifier, v)
        }
    }
}

impl PartialEq for FrameworkName {
    fn eq(&self, other: &Self) -> bool {
        self.identifier.eq_ignore_ascii_case(&other.identifier) && self.version == other.version
    }
}

impl Ord for FrameworkName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Consistent with the case-insensitive equality above.
        let own = self.identifier.to_ascii_lowercase();
        let theirs = other.identifier.to_ascii_lowercase();
        own.cmp(&theirs).then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for FrameworkName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for FrameworkName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identifier.to_ascii_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for FrameworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for FrameworkName {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FrameworkName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.token())
    }
}

impl<'de> Deserialize<'de> for FrameworkName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        FrameworkName::parse(&text).map_err(serde::de::Error::custom)
    }
}
