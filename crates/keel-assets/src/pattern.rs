//! Path pattern templates.

use crate::property::{ContentProperty, PropertyValue};
use std::collections::BTreeMap;

/// One templated path pattern, e.g. `lib/{tfm}/{assembly}`.
///
/// Literal segments must match exactly (ASCII case-insensitive, since
/// package payloads come from case-preserving archives built on
/// case-insensitive systems). `{property}` segments bind through the
/// property's parser. A trailing `{assembly}` or `{any}` consumes the rest
/// of the path, so assets may sit in nested folders.
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
    group_properties: Vec<ContentProperty>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Property(ContentProperty),
}

impl PathPattern {
    /// Parse a template string. Unknown `{tokens}` are a programming error,
    /// so this is only called on the built-in templates below.
    fn parse(template: &str, group_properties: &[ContentProperty]) -> Self {
        let segments = template
            .split('/')
            .map(|seg| {
                if let Some(token) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
                    && let Some(property) = ContentProperty::from_token(token)
                {
                    Segment::Property(property)
                } else {
                    Segment::Literal(seg.to_string())
                }
            })
            .collect();
        Self {
            segments,
            group_properties: group_properties.to_vec(),
        }
    }

    /// Try to bind `path` against this pattern.
    pub fn bind(&self, path: &str) -> Option<BTreeMap<ContentProperty, PropertyValue>> {
        let parts: Vec<&str> = path.split('/').collect();
        let mut bound = BTreeMap::new();

        for (index, segment) in self.segments.iter().enumerate() {
            let last = index == self.segments.len() - 1;
            match segment {
                Segment::Literal(literal) => {
                    let part = parts.get(index)?;
                    if !part.eq_ignore_ascii_case(literal) {
                        return None;
                    }
                }
                Segment::Property(property) => {
                    let text = if last {
                        // Trailing placeholder swallows the remainder.
                        if parts.len() <= index {
                            return None;
                        }
                        parts[index..].join("/")
                    } else {
                        parts.get(index)?.to_string()
                    };
                    let value = property.parse(&text)?;
                    bound.insert(*property, value);
                }
            }
        }

        // Paths longer than a pattern without a trailing placeholder don't
        // match it.
        if !matches!(self.segments.last(), Some(Segment::Property(_)))
            && parts.len() != self.segments.len()
        {
            return None;
        }
        Some(bound)
    }

    /// The properties whose values partition matches into groups.
    pub fn group_properties(&self) -> &[ContentProperty] {
        &self.group_properties
    }
}

/// A named family of patterns for one asset category.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<PathPattern>,
}

impl PatternSet {
    /// Compile-time assemblies: `lib/{tfm}/{assembly}`.
    pub fn compile_assemblies() -> Self {
        Self {
            patterns: vec![PathPattern::parse(
                "lib/{tfm}/{assembly}",
                &[ContentProperty::Tfm],
            )],
        }
    }

    /// Run-time assemblies: RID-specific payloads first, plain `lib/` as the
    /// RID-agnostic fallback.
    pub fn runtime_assemblies() -> Self {
        Self {
            patterns: vec![
                PathPattern::parse(
                    "runtimes/{rid}/lib/{tfm}/{assembly}",
                    &[ContentProperty::Rid, ContentProperty::Tfm],
                ),
                PathPattern::parse("lib/{tfm}/{assembly}", &[ContentProperty::Tfm]),
            ],
        }
    }

    /// Satellite resources: `resources/{tfm}/{locale}/{assembly}`.
    pub fn resource_assemblies() -> Self {
        Self {
            patterns: vec![PathPattern::parse(
                "resources/{tfm}/{locale}/{assembly}",
                &[ContentProperty::Tfm],
            )],
        }
    }

    /// Native libraries: `native/{rid}/{any}`.
    pub fn native_libraries() -> Self {
        Self {
            patterns: vec![PathPattern::parse(
                "native/{rid}/{any}",
                &[ContentProperty::Rid],
            )],
        }
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_compile_assembly() {
        let set = PatternSet::compile_assemblies();
        let bound = set.patterns()[0].bind("lib/keel45/json.klib").unwrap();
        assert_eq!(bound[&ContentProperty::Tfm].to_string(), "keel45");
        assert_eq!(bound[&ContentProperty::Assembly].to_string(), "json.klib");
    }

    #[test]
    fn test_bind_rejects_wrong_shape() {
        let set = PatternSet::compile_assemblies();
        let pattern = &set.patterns()[0];
        assert!(pattern.bind("lib/json.klib").is_none());
        assert!(pattern.bind("content/keel45/json.klib").is_none());
        // tfm segment must parse as a framework token.
        assert!(pattern.bind("lib/portable/json.klib").is_none());
    }

    #[test]
    fn test_trailing_placeholder_spans_folders() {
        let set = PatternSet::native_libraries();
        let bound = set.patterns()[0]
            .bind("native/linux-x64/sub/libkeel.so")
            .unwrap();
        assert_eq!(bound[&ContentProperty::Rid].to_string(), "linux-x64");
        assert_eq!(bound[&ContentProperty::Any].to_string(), "sub/libkeel.so");
    }

    #[test]
    fn test_assembly_does_not_span_folders() {
        let set = PatternSet::compile_assemblies();
        // The remainder joins to "sub/json.klib", which still ends in .klib;
        // nested compile assemblies are allowed.
        let bound = set.patterns()[0].bind("lib/keel45/sub/json.klib").unwrap();
        assert_eq!(bound[&ContentProperty::Assembly].to_string(), "sub/json.klib");
    }

    #[test]
    fn test_literal_match_ignores_case() {
        let set = PatternSet::compile_assemblies();
        assert!(set.patterns()[0].bind("Lib/keel45/json.klib").is_some());
    }
}
