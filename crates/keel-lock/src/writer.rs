//! Lock file serialization.
//!
//! The output is stable: maps are emitted in sorted key order, file lists
//! sorted, empty collections omitted entirely. A regenerated lock with the
//! same resolution diffs clean against the previous one.

use crate::{LockError, LockFile, LockFileTargetLibrary};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;

/// Write `lock` to `path` as pretty-printed JSON plus a trailing newline.
pub fn write(lock: &LockFile, path: &Path) -> Result<(), LockError> {
    let document = to_value(lock);
    let mut text = serde_json::to_string_pretty(&document).map_err(|e| LockError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    text.push('\n');
    fs::write(path, text).map_err(|source| LockError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn to_value(lock: &LockFile) -> Value {
    let mut root = Map::new();
    root.insert("version".to_string(), json!(lock.version));
    root.insert("locked".to_string(), json!(lock.locked));

    let mut targets = Map::new();
    let mut sorted_targets: Vec<_> = lock.targets.iter().collect();
    sorted_targets.sort_by_key(|t| t.key());
    for target in sorted_targets {
        let mut libraries = Map::new();
        let mut sorted_libraries: Vec<_> = target.libraries.iter().collect();
        sorted_libraries.sort_by_key(|l| (l.name.to_ascii_lowercase(), l.version.clone()));
        for library in sorted_libraries {
            libraries.insert(library.key(), target_library_value(library));
        }
        targets.insert(target.key(), Value::Object(libraries));
    }
    root.insert("targets".to_string(), Value::Object(targets));

    let mut libraries = Map::new();
    let mut sorted: Vec<_> = lock.libraries.iter().collect();
    sorted.sort_by_key(|l| (l.name.to_ascii_lowercase(), l.version.clone()));
    for library in sorted {
        let mut entry = Map::new();
        if !library.sha512.is_empty() {
            entry.insert("sha512".to_string(), json!(library.sha512));
        }
        if let Some(kind) = library.kind {
            entry.insert("type".to_string(), json!(kind.as_str()));
        }
        if !library.files.is_empty() {
            let mut files = library.files.clone();
            files.sort();
            entry.insert("files".to_string(), json!(files));
        }
        if let Some(path) = &library.path {
            entry.insert("path".to_string(), json!(path));
        }
        libraries.insert(library.key(), Value::Object(entry));
    }
    root.insert("libraries".to_string(), Value::Object(libraries));

    if !lock.project_file_dependency_groups.is_empty() {
        root.insert(
            "projectFileDependencyGroups".to_string(),
            json!(lock.project_file_dependency_groups),
        );
    }

    Value::Object(root)
}

fn target_library_value(library: &LockFileTargetLibrary) -> Value {
    let mut entry = Map::new();
    if let Some(kind) = library.kind {
        entry.insert("type".to_string(), json!(kind.as_str()));
    }
    if !library.dependencies.is_empty() {
        let deps: Map<String, Value> = library
            .dependencies
            .iter()
            .map(|(name, range)| {
                let value = match range {
                    Some(range) => json!(range),
                    None => Value::Null,
                };
                (name.clone(), value)
            })
            .collect();
        entry.insert("dependencies".to_string(), Value::Object(deps));
    }
    for (key, list) in [
        ("frameworkAssemblies", &library.framework_assemblies),
        ("compile", &library.compile),
        ("runtime", &library.runtime),
        ("resource", &library.resource),
        ("native", &library.native),
    ] {
        if !list.is_empty() {
            let mut sorted = list.clone();
            sorted.sort();
            entry.insert(key.to_string(), json!(sorted));
        }
    }
    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LockFileLibrary, LockFileTarget, LockLibraryKind};
    use keel_framework::FrameworkName;
    use keel_version::Version;
    use std::collections::BTreeMap;

    fn sample() -> LockFile {
        let mut lock = LockFile::new();
        let mut dependencies = BTreeMap::new();
        dependencies.insert("base".to_string(), Some("1.0.0".to_string()));
        dependencies.insert("linked".to_string(), None);

        lock.targets.push(LockFileTarget {
            framework: FrameworkName::parse("keel45").unwrap(),
            runtime_identifier: None,
            libraries: vec![LockFileTargetLibrary {
                name: "json-kit".to_string(),
                version: Version::new(1, 2, 0),
                kind: Some(LockLibraryKind::Package),
                dependencies,
                compile: vec!["lib/keel45/json.klib".to_string()],
                ..Default::default()
            }],
        });
        lock.libraries.push(LockFileLibrary {
            name: "json-kit".to_string(),
            version: Version::new(1, 2, 0),
            sha512: "hash==".to_string(),
            kind: Some(LockLibraryKind::Package),
            files: vec!["manifest.json".to_string(), "lib/keel45/json.klib".to_string()],
            path: None,
        });
        lock
    }

    #[test]
    fn test_empty_collections_omitted() {
        let value = to_value(&sample());
        let library = &value["targets"]["keel45"]["json-kit/1.2.0"];
        assert!(library.get("runtime").is_none());
        assert!(library.get("native").is_none());
        assert!(value.get("projectFileDependencyGroups").is_none());
    }

    #[test]
    fn test_null_dependency_serialized_as_null() {
        let value = to_value(&sample());
        let deps = &value["targets"]["keel45"]["json-kit/1.2.0"]["dependencies"];
        assert_eq!(deps["base"], json!("1.0.0"));
        assert!(deps["linked"].is_null());
    }

    #[test]
    fn test_output_is_stable() {
        let lock = sample();
        let a = serde_json::to_string(&to_value(&lock)).unwrap();
        let b = serde_json::to_string(&to_value(&lock)).unwrap();
        assert_eq!(a, b);
    }
}
