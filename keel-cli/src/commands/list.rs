//! The `keel list` command.

use crate::config;
use keel_store::StorePathResolver;

/// List completed installs across every configured store root.
pub fn run(packages: Option<&str>) -> Result<(), String> {
    let roots = config::package_roots(packages);
    let resolver = StorePathResolver::open(&roots).map_err(|e| e.to_string())?;

    let mut total = 0;
    for store in resolver.stores() {
        let installed = store.installed_packages().map_err(|e| e.to_string())?;
        if installed.is_empty() {
            continue;
        }
        println!("{}:", store.root().display());
        for (name, version) in installed {
            println!("  {} {}", name, version);
            total += 1;
        }
    }
    if total == 0 {
        println!("no packages installed");
    }
    Ok(())
}
