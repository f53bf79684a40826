//! The `keel pack` command.

use crate::output;
use keel_manifest::{PROJECT_MANIFEST_NAME, ProjectManifest};
use keel_store::PackageBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Payload folders included in an archive, when present.
const PAYLOAD_DIRS: [&str; 4] = ["lib", "runtimes", "resources", "native"];

/// Build a `.keelpkg` archive from a project directory.
pub fn run(path: &str, output_dir: Option<&str>, quiet: bool) -> Result<(), String> {
    let project_dir = PathBuf::from(path);
    let manifest_path = if project_dir.is_dir() {
        project_dir.join(PROJECT_MANIFEST_NAME)
    } else {
        project_dir.clone()
    };
    let root = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let project = ProjectManifest::load(&manifest_path).map_err(|e| e.to_string())?;

    let mut builder = PackageBuilder::new(&project.name, project.version.clone());
    for dependency in &project.dependencies {
        let range = dependency
            .range
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_default();
        builder = builder.dependency(&dependency.name, range);
    }
    for (framework, dependencies) in &project.frameworks {
        for dependency in dependencies {
            let range = dependency
                .range
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_default();
            builder = builder.framework_dependency(framework.clone(), &dependency.name, range);
        }
    }

    let mut file_count = 0;
    for dir in PAYLOAD_DIRS {
        let payload = root.join(dir);
        if !payload.is_dir() {
            continue;
        }
        for (relative, contents) in collect_files(&payload, &root)? {
            builder = builder.file(relative, &contents);
            file_count += 1;
        }
    }
    if file_count == 0 {
        output::warning("no payload files found; packing the manifest alone");
    }

    let out = output_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| root.clone());
    let archive = builder.write_to(&out).map_err(|e| e.to_string())?;
    if !quiet {
        output::success(&format!("packed {}", archive.display()));
    }
    Ok(())
}

/// All files under `dir`, as archive-relative paths plus contents.
fn collect_files(dir: &Path, root: &Path) -> Result<Vec<(String, Vec<u8>)>, String> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).map_err(|e| e.to_string())? {
            let entry = entry.map_err(|e| e.to_string())?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let relative = path
                    .strip_prefix(root)
                    .map_err(|e| e.to_string())?
                    .to_string_lossy()
                    .replace('\\', "/");
                let contents = fs::read(&path).map_err(|e| e.to_string())?;
                out.push((relative, contents));
            }
        }
    }
    out.sort();
    Ok(out)
}
