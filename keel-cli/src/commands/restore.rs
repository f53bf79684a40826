//! The `keel restore` command.

use crate::{config, output};
use std::path::Path;

/// Restore a project's dependencies and write its lock file.
///
/// Returns whether the restore completed with warnings, so the caller can
/// exit with the distinct warning status.
#[allow(clippy::too_many_arguments)]
pub fn run(
    path: &str,
    sources: &[String],
    packages: Option<&str>,
    no_cache: bool,
    ignore_failed_sources: bool,
    runtimes: &[String],
    verbose: bool,
    quiet: bool,
) -> Result<bool, String> {
    let config = config::build(
        packages,
        sources,
        no_cache,
        ignore_failed_sources,
        runtimes.to_vec(),
    );
    if config.sources.is_empty() {
        return Err(format!(
            "no package sources configured; pass --source or set {}",
            config::SOURCES_VAR
        ));
    }
    if verbose && !quiet {
        for source in &config.sources {
            output::info(&format!("using source {source}"));
        }
        for root in &config.package_roots {
            output::info(&format!("using package store {}", root.display()));
        }
    }

    let summary =
        keel_restore::restore(Path::new(path), &config).map_err(|e| e.to_string())?;

    if !quiet {
        for warning in &summary.warnings {
            output::warning(warning);
        }
        if summary.installed > 0 {
            output::info(&format!("installed {} package(s)", summary.installed));
        }
        if summary.completed_with_warnings() {
            output::warning(&format!(
                "restore completed with {} warning(s); wrote {}",
                summary.warnings.len(),
                summary.lock_path.display()
            ));
        } else {
            output::success(&format!("restore complete; wrote {}", summary.lock_path.display()));
        }
    }
    Ok(summary.completed_with_warnings())
}
