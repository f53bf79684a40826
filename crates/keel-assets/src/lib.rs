//! Asset-group selection for Keel packages.
//!
//! A package payload is a flat list of relative paths. Which of those files a
//! consuming project actually uses depends on its target framework and
//! runtime: `lib/keel45/json.klib` serves a `keel45` project, while
//! `runtimes/linux-x64/lib/keel45/json.klib` additionally requires running on
//! `linux-x64`. This crate matches paths against templated patterns, groups
//! them by bound properties, and picks the best group for a selection
//! criteria, preferring the most specific compatible match.

mod collection;
mod pattern;
mod property;

pub use collection::{
    ContentItem, ContentItemCollection, ContentItemGroup, CriteriaEntry, SelectionCriteria,
    SelectionCriteriaBuilder,
};
pub use pattern::{PathPattern, PatternSet};
pub use property::{ContentProperty, PropertyValue};
