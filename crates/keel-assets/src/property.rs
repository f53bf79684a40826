//! Path-segment properties.
//!
//! Pattern templates bind path segments to named properties. Each property
//! knows how to parse a segment, how to judge a bound value against a
//! selection criterion, and how to rank two bound values that both satisfy
//! the criterion.

use keel_framework::FrameworkName;
use std::fmt;

/// A value bound from a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Framework(FrameworkName),
    Text(String),
}

impl PropertyValue {
    pub fn framework(&self) -> Option<&FrameworkName> {
        match self {
            PropertyValue::Framework(fw) => Some(fw),
            PropertyValue::Text(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Framework(fw) => write!(f, "{fw}"),
            PropertyValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// The properties a pattern segment can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentProperty {
    /// Target framework token, e.g. `keel45`.
    Tfm,
    /// Runtime identifier, e.g. `linux-x64`.
    Rid,
    /// Resource locale, e.g. `de-DE`.
    Locale,
    /// Assembly file name, must end in `.klib`.
    Assembly,
    /// Anything, including nested paths.
    Any,
}

impl ContentProperty {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "tfm" => Some(ContentProperty::Tfm),
            "rid" => Some(ContentProperty::Rid),
            "locale" => Some(ContentProperty::Locale),
            "assembly" => Some(ContentProperty::Assembly),
            "any" => Some(ContentProperty::Any),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContentProperty::Tfm => "tfm",
            ContentProperty::Rid => "rid",
            ContentProperty::Locale => "locale",
            ContentProperty::Assembly => "assembly",
            ContentProperty::Any => "any",
        }
    }

    /// Parse one path segment (or the joined remainder, for [`Self::Any`])
    /// into a value, or reject the segment.
    pub fn parse(&self, segment: &str) -> Option<PropertyValue> {
        if segment.is_empty() {
            return None;
        }
        match self {
            ContentProperty::Tfm => FrameworkName::parse(segment)
                .ok()
                .map(PropertyValue::Framework),
            ContentProperty::Assembly => segment
                .ends_with(".klib")
                .then(|| PropertyValue::Text(segment.to_string())),
            ContentProperty::Rid | ContentProperty::Locale | ContentProperty::Any => {
                Some(PropertyValue::Text(segment.to_string()))
            }
        }
    }

    /// Whether `candidate` (a group's bound value) satisfies `criterion`
    /// (what the consuming project asked for).
    pub fn is_criteria_satisfied(
        &self,
        criterion: &PropertyValue,
        candidate: &PropertyValue,
    ) -> bool {
        match self {
            ContentProperty::Tfm => match (candidate.framework(), criterion.framework()) {
                (Some(candidate), Some(target)) => candidate.is_compatible_with(target),
                _ => false,
            },
            // RIDs match exactly; criteria entries enumerate the acceptable
            // ones in preference order.
            ContentProperty::Rid => criterion == candidate,
            ContentProperty::Locale | ContentProperty::Assembly | ContentProperty::Any => true,
        }
    }

    /// Whether `a` is a strictly better match than `b` for `criterion`.
    /// Only called for values that already satisfy the criterion.
    pub fn is_better_match(
        &self,
        _criterion: &PropertyValue,
        a: &PropertyValue,
        b: &PropertyValue,
    ) -> bool {
        match self {
            // Nearest framework: the highest compatible version.
            ContentProperty::Tfm => match (a.framework(), b.framework()) {
                (Some(a), Some(b)) => a.version > b.version,
                _ => false,
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tfm_parse() {
        assert!(matches!(
            ContentProperty::Tfm.parse("keel45"),
            Some(PropertyValue::Framework(_))
        ));
        assert!(ContentProperty::Tfm.parse("not-a-framework").is_none());
    }

    #[test]
    fn test_assembly_requires_extension() {
        assert!(ContentProperty::Assembly.parse("json.klib").is_some());
        assert!(ContentProperty::Assembly.parse("readme.txt").is_none());
    }

    #[test]
    fn test_tfm_criteria() {
        let target = PropertyValue::Framework(FrameworkName::parse("keel45").unwrap());
        let older = PropertyValue::Framework(FrameworkName::parse("keel40").unwrap());
        let newer = PropertyValue::Framework(FrameworkName::parse("keel46").unwrap());

        assert!(ContentProperty::Tfm.is_criteria_satisfied(&target, &older));
        assert!(!ContentProperty::Tfm.is_criteria_satisfied(&target, &newer));
        assert!(ContentProperty::Tfm.is_better_match(&target, &target, &older));
    }

    #[test]
    fn test_rid_is_exact() {
        let linux = PropertyValue::Text("linux-x64".to_string());
        let windows = PropertyValue::Text("win-x64".to_string());
        assert!(ContentProperty::Rid.is_criteria_satisfied(&linux, &linux));
        assert!(!ContentProperty::Rid.is_criteria_satisfied(&linux, &windows));
    }
}
