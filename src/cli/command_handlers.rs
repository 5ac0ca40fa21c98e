use std::{path::Path, sync::Arc};

use log::{info, warn};

use crate::{
    git::VersionControl,
    install::{InstallMode, InstallOutcome, InstallReport, Installer},
    model::manifest::Manifest,
};

/// Handler to install command
/// 1 - Reads the manifest and merges dependencies with devDependencies
/// 2 - Creates and locks the modules folder
/// 3 - Empties it when `safe` is false
/// 4 - Synchronizes every module
pub async fn do_install<V: VersionControl>(
    installer: &Arc<Installer<V>>,
    manifest_path: &Path,
    mode: InstallMode,
    safe: bool,
) -> anyhow::Result<InstallReport> {
    let manifest = Manifest::from_file(manifest_path)?;
    let specifiers = manifest.specifiers();

    let modules = installer.modules();
    modules.create()?;
    let _lock = modules.lock()?;

    if !safe {
        modules.clear()?;
    }

    let report = installer.install_all(&specifiers, mode).await?;
    log_report(&report);
    Ok(report)
}

/// Handler to show changed modules command
pub fn do_show_changed_modules<V: VersionControl>(
    installer: &Installer<V>,
) -> anyhow::Result<Vec<String>> {
    let changed = installer.changed_modules()?;

    if changed.is_empty() {
        info!("You have no unsaved modules");
    } else {
        warn!(
            "Unsaved modules ({}):\n\n{}",
            changed.len(),
            changed.join("\n")
        );
    }

    Ok(changed)
}

fn log_report(report: &InstallReport) {
    for (name, outcome) in &report.outcomes {
        match outcome {
            InstallOutcome::Failed(_) => warn!("{}: {}", name, outcome),
            _ => info!("{}: {}", name, outcome),
        }
    }
    info!(
        "{} cloned, {} skipped with unsaved changes, {} failed",
        report.cloned().len(),
        report.skipped_dirty().len(),
        report.failures().len()
    );
}
