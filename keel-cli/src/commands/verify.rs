//! The `keel verify` command.

use crate::{config, output};
use keel_store::StorePathResolver;

/// Re-hash every installed archive and compare against its sidecar.
pub fn run(packages: Option<&str>, quiet: bool) -> Result<(), String> {
    let roots = config::package_roots(packages);
    let resolver = StorePathResolver::open(&roots).map_err(|e| e.to_string())?;

    let mut checked = 0;
    let mut corrupt = Vec::new();
    for store in resolver.stores() {
        for (name, version) in store.installed_packages().map_err(|e| e.to_string())? {
            checked += 1;
            match store.verify(&name, &version) {
                Ok(true) => {}
                Ok(false) => corrupt.push(format!(
                    "{} {} in {}",
                    name,
                    version,
                    store.root().display()
                )),
                Err(e) => corrupt.push(format!(
                    "{} {} in {}: {}",
                    name,
                    version,
                    store.root().display(),
                    e
                )),
            }
        }
    }

    if corrupt.is_empty() {
        if !quiet {
            output::success(&format!("{checked} package(s) verified"));
        }
        Ok(())
    } else {
        for entry in &corrupt {
            output::error(entry);
        }
        Err(format!(
            "{} of {} package(s) failed verification",
            corrupt.len(),
            checked
        ))
    }
}
