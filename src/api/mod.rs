use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use crate::{
    cli::command_handlers::{do_install, do_show_changed_modules},
    git::Git2Toolkit,
    install::{InstallMode, InstallReport, Installer},
};

mod builder;

pub use builder::EasyModulesBuilder;

pub struct EasyModules {
    installer: Arc<Installer<Git2Toolkit>>,
    manifest_path: PathBuf,
    concurrency: Option<NonZeroUsize>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InstallOptions {
    /// Run one unit of work per module instead of one module at a time.
    pub parallel: bool,
    /// Check every module separately and keep the ones with unsaved changes.
    /// When `false` the whole modules folder is emptied first.
    pub safe: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            parallel: true,
            safe: true,
        }
    }
}

impl EasyModules {
    pub fn builder() -> EasyModulesBuilder {
        EasyModulesBuilder::default()
    }

    /// Installs every git module listed in the manifest
    pub async fn install(&self, options: InstallOptions) -> anyhow::Result<InstallReport> {
        do_install(
            &self.installer,
            &self.manifest_path,
            InstallMode::new(options.parallel, self.concurrency),
            options.safe,
        )
        .await
    }

    /// Lists installed modules with unsaved git changes
    pub fn changed_modules(&self) -> anyhow::Result<Vec<String>> {
        do_show_changed_modules(&self.installer)
    }
}
