//! Version ranges: constraint satisfaction and best-match selection.

use crate::{Version, VersionError};
use std::fmt;
use std::str::FromStr;

/// How a floating range tracks newly published versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatBehavior {
    /// Not a floating range.
    #[default]
    None,
    /// The prerelease tag floats (`1.0.0-*`, `1.0.0-beta-*`).
    Prerelease,
    /// The minor component and below float (`1.*`).
    Minor,
    /// The patch component floats (`1.0.*`).
    Patch,
}

/// A version constraint.
///
/// Four surface forms are accepted by [`VersionRange::parse`]:
///
/// - `1.0.0` — bare minimum, inclusive (`>= 1.0.0`)
/// - `[1.0.0]` — exact
/// - `[1.0.0, 2.0.0)` — interval with per-bound inclusivity
/// - `1.0.*`, `1.*`, `1.0.0-*`, `1.0.0-beta-*` — floating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<Version>,
    pub max: Option<Version>,
    pub include_min: bool,
    pub include_max: bool,
    pub float: FloatBehavior,
    /// For prerelease floats, the fixed tag prefix (`beta` in `1.0-beta-*`).
    pub float_prefix: Option<String>,
}

impl VersionRange {
    /// A range accepting any version at or above `min`.
    pub fn at_least(min: Version) -> Self {
        Self {
            min: Some(min),
            max: None,
            include_min: true,
            include_max: false,
            float: FloatBehavior::None,
            float_prefix: None,
        }
    }

    /// A range accepting exactly `version`.
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            max: Some(version),
            include_min: true,
            include_max: true,
            float: FloatBehavior::None,
            float_prefix: None,
        }
    }

    /// Parse a range from its textual form.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VersionError::InvalidRange(
                text.to_string(),
                "empty range".to_string(),
            ));
        }

        if text.starts_with('[') || text.starts_with('(') {
            return Self::parse_interval(text);
        }
        if text.contains('*') {
            return Self::parse_floating(text);
        }

        // Bare version: minimum-inclusive.
        Ok(Self::at_least(Version::parse(text)?))
    }

    /// Parse bracket/paren interval syntax.
    fn parse_interval(text: &str) -> Result<Self, VersionError> {
        let err = |why: &str| VersionError::InvalidRange(text.to_string(), why.to_string());

        let include_min = text.starts_with('[');
        let include_max = text.ends_with(']');
        if !text.ends_with(']') && !text.ends_with(')') {
            return Err(err("missing closing bracket"));
        }

        let inner = &text[1..text.len() - 1];
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();

        match parts.as_slice() {
            // `[1.0.0]` — exact pin; parens make no sense here.
            [single] => {
                if !include_min || !include_max {
                    return Err(err("exact range requires square brackets"));
                }
                Ok(Self::exact(Version::parse(single)?))
            }
            [lo, hi] => {
                let min = if lo.is_empty() {
                    None
                } else {
                    Some(Version::parse(lo)?)
                };
                let max = if hi.is_empty() {
                    None
                } else {
                    Some(Version::parse(hi)?)
                };
                if min.is_none() && max.is_none() {
                    return Err(err("interval has no bounds"));
                }
                if let (Some(lo), Some(hi)) = (&min, &max)
                    && lo > hi
                {
                    return Err(err("lower bound exceeds upper bound"));
                }
                Ok(Self {
                    min,
                    max,
                    include_min,
                    include_max,
                    float: FloatBehavior::None,
                    float_prefix: None,
                })
            }
            _ => Err(err("expected one or two comma-separated versions")),
        }
    }

    /// Parse floating/wildcard syntax.
    fn parse_floating(text: &str) -> Result<Self, VersionError> {
        let err = |why: &str| VersionError::InvalidRange(text.to_string(), why.to_string());

        if let Some(prefix) = text.strip_suffix('*') {
            if let Some(fixed) = prefix.strip_suffix('-') {
                // `1.0.0-*` or `1.0.0-beta-*`: the prerelease tag floats.
                let (numbers, tag_prefix) = match fixed.split_once('-') {
                    Some((n, tag)) => (n, Some(tag.to_string())),
                    None => (fixed, None),
                };
                let min = Version::parse(numbers)?;
                return Ok(Self {
                    min: Some(min),
                    max: None,
                    include_min: true,
                    include_max: false,
                    float: FloatBehavior::Prerelease,
                    float_prefix: tag_prefix,
                });
            }
            if let Some(fixed) = prefix.strip_suffix('.') {
                // `1.*` or `1.0.*`: a numeric component floats.
                let float = match fixed.split('.').count() {
                    1 => FloatBehavior::Minor,
                    2 => FloatBehavior::Patch,
                    _ => return Err(err("too many fixed components for wildcard")),
                };
                let min = Version::parse(fixed)?;
                return Ok(Self {
                    min: Some(min),
                    max: None,
                    include_min: true,
                    include_max: false,
                    float,
                    float_prefix: None,
                });
            }
        }
        Err(err("malformed wildcard"))
    }

    /// Whether the range pins a single exact version.
    pub fn is_exact(&self) -> bool {
        self.float == FloatBehavior::None
            && self.include_min
            && self.include_max
            && self.min.is_some()
            && self.min == self.max
    }

    /// Whether the range floats.
    pub fn is_floating(&self) -> bool {
        self.float != FloatBehavior::None
    }

    /// Does `version` satisfy this range?
    pub fn satisfies(&self, version: &Version) -> bool {
        let Some(min) = &self.min else {
            return self.check_max(version);
        };

        match self.float {
            FloatBehavior::None => self.check_min(version, min) && self.check_max(version),
            FloatBehavior::Prerelease => {
                // Fixed triple must match; the tag is unconstrained apart
                // from an optional fixed prefix.
                if version.release() != min.release() {
                    return false;
                }
                match (&self.float_prefix, &version.prerelease) {
                    (None, _) => true,
                    (Some(prefix), Some(tag)) => tag.starts_with(prefix.as_str()),
                    (Some(_), None) => false,
                }
            }
            FloatBehavior::Minor => {
                version.major == min.major && !version.is_prerelease() && version >= min
            }
            FloatBehavior::Patch => {
                version.major == min.major
                    && version.minor == min.minor
                    && !version.is_prerelease()
                    && version >= min
            }
        }
    }

    fn check_min(&self, version: &Version, min: &Version) -> bool {
        if self.include_min {
            version >= min
        } else {
            version > min
        }
    }

    fn check_max(&self, version: &Version) -> bool {
        match &self.max {
            None => true,
            Some(max) if self.include_max => version <= max,
            Some(max) => version < max,
        }
    }

    /// Should `candidate` replace `current` as the best match for this range?
    ///
    /// The tie-break policy that makes resolution deterministic:
    ///
    /// 1. a satisfying version always beats a non-satisfying one;
    /// 2. among satisfying versions the highest wins, except that an exact
    ///    non-floating range admits only its pinned version, which therefore
    ///    wins outright;
    /// 3. among non-satisfying versions (fallback when nothing satisfies)
    ///    the highest available wins.
    pub fn is_better_match(&self, current: Option<&Version>, candidate: &Version) -> bool {
        let Some(current) = current else {
            return true;
        };
        if candidate == current {
            return false;
        }

        let current_ok = self.satisfies(current);
        let candidate_ok = self.satisfies(candidate);
        if candidate_ok != current_ok {
            return candidate_ok;
        }
        if current_ok && self.is_exact() {
            // Both equal the pin, handled by the equality check above; an
            // exact range never trades its pinned version away.
            return false;
        }
        candidate > current
    }

    /// The best match among `candidates`, independent of their order.
    pub fn best_match<'a, I>(&self, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        let mut best: Option<&Version> = None;
        for candidate in candidates {
            if self.is_better_match(best, candidate) {
                best = Some(candidate);
            }
        }
        best
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.float {
            FloatBehavior::Prerelease => {
                if let Some(min) = &self.min {
                    write!(f, "{}.{}.{}-", min.major, min.minor, min.patch)?;
                }
                if let Some(prefix) = &self.float_prefix {
                    write!(f, "{}-", prefix)?;
                }
                return write!(f, "*");
            }
            FloatBehavior::Minor => {
                if let Some(min) = &self.min {
                    write!(f, "{}.", min.major)?;
                }
                return write!(f, "*");
            }
            FloatBehavior::Patch => {
                if let Some(min) = &self.min {
                    write!(f, "{}.{}.", min.major, min.minor)?;
                }
                return write!(f, "*");
            }
            FloatBehavior::None => {}
        }

        if self.is_exact()
            && let Some(min) = &self.min
        {
            return write!(f, "[{}]", min);
        }
        match (&self.min, &self.max) {
            (Some(min), None) if self.include_min => write!(f, "{}", min),
            (min, max) => {
                write!(f, "{}", if self.include_min { '[' } else { '(' })?;
                if let Some(min) = min {
                    write!(f, "{}", min)?;
                }
                write!(f, ", ")?;
                if let Some(max) = max {
                    write!(f, "{}", max)?;
                }
                write!(f, "{}", if self.include_max { ']' } else { ')' })
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn r(text: &str) -> VersionRange {
        VersionRange::parse(text).unwrap()
    }

    #[test]
    fn test_bare_minimum() {
        let range = r("1.0.0");
        assert!(range.satisfies(&v("1.0.0")));
        assert!(range.satisfies(&v("9.0.0")));
        assert!(!range.satisfies(&v("0.9.0")));
    }

    #[test]
    fn test_interval_half_open() {
        let range = r("[1.0.0, 2.0.0)");
        assert!(range.satisfies(&v("1.0.0")));
        assert!(range.satisfies(&v("1.9.9")));
        assert!(!range.satisfies(&v("2.0.0")));
    }

    #[test]
    fn test_exact() {
        let range = r("[1.2.3]");
        assert!(range.is_exact());
        assert!(range.satisfies(&v("1.2.3")));
        assert!(!range.satisfies(&v("1.2.4")));
    }

    #[test]
    fn test_open_lower_bound() {
        let range = r("(1.0.0, 2.0.0]");
        assert!(!range.satisfies(&v("1.0.0")));
        assert!(range.satisfies(&v("2.0.0")));
    }

    #[test]
    fn test_missing_bound() {
        let range = r("(, 2.0.0)");
        assert!(range.satisfies(&v("0.1.0")));
        assert!(!range.satisfies(&v("2.0.0")));
    }

    #[test]
    fn test_malformed_intervals() {
        assert!(VersionRange::parse("[1.0.0, 2.0.0").is_err());
        assert!(VersionRange::parse("[1.0.0, 2.0.0, 3.0.0]").is_err());
        assert!(VersionRange::parse("[2.0.0, 1.0.0]").is_err());
        assert!(VersionRange::parse("(1.0.0)").is_err());
        assert!(VersionRange::parse("[1.x, 2.0.0]").is_err());
        assert!(VersionRange::parse("[,]").is_err());
    }

    #[test]
    fn test_prerelease_float() {
        let range = r("1.0.0-*");
        assert_eq!(range.float, FloatBehavior::Prerelease);
        assert!(range.satisfies(&v("1.0.0-alpha")));
        assert!(range.satisfies(&v("1.0.0")));
        assert!(!range.satisfies(&v("1.0.1-alpha")));
    }

    #[test]
    fn test_prerelease_float_with_prefix() {
        let range = r("1.0-beta-*");
        assert!(range.satisfies(&v("1.0.0-beta-3")));
        assert!(!range.satisfies(&v("1.0.0-rc1")));
        assert!(!range.satisfies(&v("1.0.0")));
    }

    #[test]
    fn test_numeric_floats() {
        let minor = r("1.*");
        assert!(minor.satisfies(&v("1.9.0")));
        assert!(!minor.satisfies(&v("2.0.0")));

        let patch = r("1.2.*");
        assert!(patch.satisfies(&v("1.2.7")));
        assert!(!patch.satisfies(&v("1.3.0")));
    }

    #[test]
    fn test_best_match_highest_satisfying() {
        let range = r("[1.0.0, 2.0.0)");
        let candidates = [v("1.0.0"), v("1.2.0"), v("2.0.0")];
        assert_eq!(range.best_match(candidates.iter()), Some(&v("1.2.0")));

        // Presentation order must not matter.
        let reversed = [v("2.0.0"), v("1.2.0"), v("1.0.0")];
        assert_eq!(range.best_match(reversed.iter()), Some(&v("1.2.0")));
    }

    #[test]
    fn test_best_match_fallback_highest() {
        // Nothing satisfies; highest available wins.
        let range = r("[3.0.0, 4.0.0)");
        let candidates = [v("1.0.0"), v("2.5.0")];
        assert_eq!(range.best_match(candidates.iter()), Some(&v("2.5.0")));
    }

    #[test]
    fn test_satisfying_beats_higher_nonsatisfying() {
        let range = r("[1.0.0, 2.0.0)");
        assert!(!range.is_better_match(Some(&v("1.5.0")), &v("3.0.0")));
        assert!(range.is_better_match(Some(&v("3.0.0")), &v("1.0.0")));
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["1.0.0", "[1.0.0, 2.0.0)", "[1.2.3]", "1.0.*", "1.*", "1.0.0-*"] {
            let range = r(text);
            assert_eq!(VersionRange::parse(&range.to_string()).unwrap(), range);
        }
    }
}
