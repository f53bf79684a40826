//! Lock file parsing and validation.

use crate::{
    LockError, LockFile, LockFileLibrary, LockFileTarget, LockFileTargetLibrary, LockLibraryKind,
};
use keel_framework::TargetKey;
use keel_version::Version;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Read and validate a lock file.
///
/// Missing or mismatched `version` is [`LockError::UnsupportedVersion`] so
/// callers can choose between regenerating and failing. A target-library
/// dependency naming a library absent from the top-level `libraries` map is
/// [`LockError::Inconsistent`].
pub fn read(path: &Path) -> Result<LockFile, LockError> {
    let text = fs::read_to_string(path).map_err(|source| LockError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&text).map_err(|e| LockError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse(&document, path)
}

pub(crate) fn parse(document: &Value, path: &Path) -> Result<LockFile, LockError> {
    let format = |reason: &str| LockError::Format {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let root = document.as_object().ok_or_else(|| format("not an object"))?;
    for required in ["version", "targets", "libraries"] {
        if !root.contains_key(required) {
            return Err(format(&format!("missing required key '{required}'")));
        }
    }

    let version = root["version"].as_i64().unwrap_or(-1);
    if version != crate::CURRENT_VERSION {
        return Err(LockError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: version,
        });
    }

    let mut lock = LockFile::new();
    lock.locked = root.get("locked").and_then(Value::as_bool).unwrap_or(false);

    let libraries = root["libraries"]
        .as_object()
        .ok_or_else(|| format("'libraries' is not an object"))?;
    for (key, entry) in libraries {
        let (name, version) = split_key(key).map_err(|reason| format(&reason))?;
        lock.libraries.push(LockFileLibrary {
            name,
            version,
            sha512: entry
                .get("sha512")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            kind: entry
                .get("type")
                .and_then(Value::as_str)
                .and_then(LockLibraryKind::parse),
            files: string_list(entry.get("files")),
            path: entry
                .get("path")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    let targets = root["targets"]
        .as_object()
        .ok_or_else(|| format("'targets' is not an object"))?;
    for (target_key, entries) in targets {
        let key = TargetKey::parse(target_key)
            .map_err(|e| format(&format!("bad target key '{target_key}': {e}")))?;

        let entries = entries
            .as_object()
            .ok_or_else(|| format(&format!("target '{target_key}' is not an object")))?;
        let mut target = LockFileTarget {
            framework: key.framework,
            runtime_identifier: key.runtime,
            libraries: Vec::new(),
        };
        for (key, entry) in entries {
            let (name, version) = split_key(key).map_err(|reason| format(&reason))?;
            let mut dependencies = BTreeMap::new();
            if let Some(deps) = entry.get("dependencies").and_then(Value::as_object) {
                for (dep_name, dep_range) in deps {
                    let range = match dep_range {
                        // A null range round-trips as None.
                        Value::Null => None,
                        Value::String(text) => Some(text.clone()),
                        other => {
                            return Err(format(&format!(
                                "dependency '{dep_name}' has non-string range {other}"
                            )));
                        }
                    };
                    dependencies.insert(dep_name.clone(), range);
                }
            }
            target.libraries.push(LockFileTargetLibrary {
                name,
                version,
                kind: entry
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(LockLibraryKind::parse),
                dependencies,
                framework_assemblies: string_list(entry.get("frameworkAssemblies")),
                compile: string_list(entry.get("compile")),
                runtime: string_list(entry.get("runtime")),
                resource: string_list(entry.get("resource")),
                native: string_list(entry.get("native")),
            });
        }
        lock.targets.push(target);
    }

    if let Some(groups) = root
        .get("projectFileDependencyGroups")
        .and_then(Value::as_object)
    {
        for (key, specs) in groups {
            lock.project_file_dependency_groups
                .insert(key.clone(), string_list(Some(specs)));
        }
    }

    check_integrity(&lock, path)?;
    Ok(lock)
}

/// Every target library and every dependency edge must resolve to a
/// top-level library entry.
fn check_integrity(lock: &LockFile, path: &Path) -> Result<(), LockError> {
    let inconsistent = |reason: String| LockError::Inconsistent {
        path: path.to_path_buf(),
        reason,
    };

    let known: Vec<(String, &Version)> = lock
        .libraries
        .iter()
        .map(|l| (l.name.to_ascii_lowercase(), &l.version))
        .collect();

    for target in &lock.targets {
        for library in &target.libraries {
            let key = (library.name.to_ascii_lowercase(), &library.version);
            if !known.contains(&key) {
                return Err(inconsistent(format!(
                    "target '{}' lists '{}' with no matching library entry",
                    target.key(),
                    library.key()
                )));
            }
            for dep_name in library.dependencies.keys() {
                let resolved = target.libraries.iter().find(|candidate| {
                    candidate.name.eq_ignore_ascii_case(dep_name)
                });
                let Some(resolved) = resolved else {
                    return Err(inconsistent(format!(
                        "'{}' depends on '{dep_name}', absent from target '{}'",
                        library.key(),
                        target.key()
                    )));
                };
                let dep_key = (resolved.name.to_ascii_lowercase(), &resolved.version);
                if !known.contains(&dep_key) {
                    return Err(inconsistent(format!(
                        "dependency '{}' has no matching library entry",
                        resolved.key()
                    )));
                }
            }
        }
    }
    Ok(())
}

fn split_key(key: &str) -> Result<(String, Version), String> {
    let (name, version_text) = key
        .rsplit_once('/')
        .ok_or_else(|| format!("bad library key '{key}', expected 'name/version'"))?;
    let version = Version::parse(version_text)
        .map_err(|e| format!("bad library key '{key}': {e}"))?;
    Ok((name.to_string(), version))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
