//! Grouping and best-group selection.

use crate::pattern::PatternSet;
use crate::property::{ContentProperty, PropertyValue};
use keel_framework::FrameworkName;
use std::collections::BTreeMap;

/// One payload file with the property values a pattern bound from its path.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub path: String,
    pub properties: BTreeMap<ContentProperty, PropertyValue>,
}

/// Files sharing the same bound values for a pattern's group properties.
#[derive(Debug, Clone)]
pub struct ContentItemGroup {
    pub properties: BTreeMap<ContentProperty, PropertyValue>,
    pub items: Vec<ContentItem>,
}

/// One criteria entry: the property values the consumer requires, in
/// decreasing specificity across entries. A `None` value requires the group
/// NOT to bind that property, which is how RID-agnostic entries exclude
/// runtime-specific groups.
pub type CriteriaEntry = Vec<(ContentProperty, Option<PropertyValue>)>;

/// An ordered list of criteria entries, most specific first.
#[derive(Debug, Clone)]
pub struct SelectionCriteria {
    entries: Vec<CriteriaEntry>,
}

impl SelectionCriteria {
    pub fn builder() -> SelectionCriteriaBuilder {
        SelectionCriteriaBuilder {
            entries: Vec::new(),
        }
    }

    /// The standard criteria for a restore target: one `{rid, tfm}` entry
    /// per acceptable runtime identifier in preference order, then a
    /// RID-agnostic `{tfm}` entry.
    pub fn for_target(framework: &FrameworkName, runtimes: &[String]) -> Self {
        let tfm = PropertyValue::Framework(framework.clone());
        let mut builder = Self::builder();
        for rid in runtimes {
            builder = builder.entry(vec![
                (ContentProperty::Rid, Some(PropertyValue::Text(rid.clone()))),
                (ContentProperty::Tfm, Some(tfm.clone())),
            ]);
        }
        builder
            .entry(vec![
                (ContentProperty::Rid, None),
                (ContentProperty::Tfm, Some(tfm)),
            ])
            .build()
    }

    /// Criteria for framework-agnostic categories (native libraries): one
    /// entry per acceptable runtime identifier, nothing else.
    pub fn for_runtime(runtimes: &[String]) -> Self {
        let mut builder = Self::builder();
        for rid in runtimes {
            builder = builder.entry(vec![(
                ContentProperty::Rid,
                Some(PropertyValue::Text(rid.clone())),
            )]);
        }
        builder.build()
    }

    pub fn entries(&self) -> &[CriteriaEntry] {
        &self.entries
    }
}

pub struct SelectionCriteriaBuilder {
    entries: Vec<CriteriaEntry>,
}

impl SelectionCriteriaBuilder {
    pub fn entry(mut self, pairs: CriteriaEntry) -> Self {
        self.entries.push(pairs);
        self
    }

    pub fn build(self) -> SelectionCriteria {
        SelectionCriteria {
            entries: self.entries,
        }
    }
}

/// The flat file list of one package, queryable by pattern set.
#[derive(Debug, Clone)]
pub struct ContentItemCollection {
    paths: Vec<String>,
}

impl ContentItemCollection {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| p.into().replace('\\', "/"))
                .collect(),
        }
    }

    /// All candidate groups for a pattern set, keyed by the patterns' group
    /// property values.
    pub fn find_item_groups(&self, pattern_set: &PatternSet) -> Vec<ContentItemGroup> {
        let mut groups: Vec<ContentItemGroup> = Vec::new();

        for path in &self.paths {
            for pattern in pattern_set.patterns() {
                let Some(bound) = pattern.bind(path) else {
                    continue;
                };
                let key: BTreeMap<ContentProperty, PropertyValue> = pattern
                    .group_properties()
                    .iter()
                    .filter_map(|p| bound.get(p).map(|v| (*p, v.clone())))
                    .collect();

                let item = ContentItem {
                    path: path.clone(),
                    properties: bound,
                };
                match groups.iter_mut().find(|g| g.properties == key) {
                    Some(group) => group.items.push(item),
                    None => groups.push(ContentItemGroup {
                        properties: key,
                        items: vec![item],
                    }),
                }
                // First matching pattern claims the path.
                break;
            }
        }
        groups
    }

    /// The single best group for `criteria`, or `None` when no entry
    /// matches anything (an empty asset category, not an error).
    pub fn find_best_item_group(
        &self,
        criteria: &SelectionCriteria,
        pattern_set: &PatternSet,
    ) -> Option<ContentItemGroup> {
        let groups = self.find_item_groups(pattern_set);

        for entry in criteria.entries() {
            let mut best: Option<&ContentItemGroup> = None;
            for group in &groups {
                if !entry_satisfied(entry, group) {
                    continue;
                }
                best = match best {
                    None => Some(group),
                    Some(current) => {
                        if group_beats(entry, group, current) {
                            Some(group)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
            if let Some(group) = best {
                return Some(group.clone());
            }
        }
        None
    }
}

fn entry_satisfied(entry: &CriteriaEntry, group: &ContentItemGroup) -> bool {
    entry.iter().all(|(property, criterion)| {
        match (criterion, group.properties.get(property)) {
            (Some(criterion), Some(value)) => {
                property.is_criteria_satisfied(criterion, value)
            }
            // Required property the group never bound.
            (Some(_), None) => false,
            // Absence requirement.
            (None, bound) => bound.is_none(),
        }
    })
}

/// Whether `a` beats `b` on the first entry property where they differ.
fn group_beats(entry: &CriteriaEntry, a: &ContentItemGroup, b: &ContentItemGroup) -> bool {
    for (property, criterion) in entry {
        let Some(criterion) = criterion else { continue };
        if let (Some(va), Some(vb)) = (a.properties.get(property), b.properties.get(property)) {
            if property.is_better_match(criterion, va, vb) {
                return true;
            }
            if property.is_better_match(criterion, vb, va) {
                return false;
            }
        }
    }
    false
}
