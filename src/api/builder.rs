use std::{env, num::NonZeroUsize, path::PathBuf, sync::Arc};

use crate::{
    config::EasyModulesConfig,
    git::{Git2Toolkit, SshCredentials},
    install::Installer,
    modules::ModulesRoot,
    EasyModules,
};

#[derive(Default)]
pub struct EasyModulesBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    modules_directory: Option<PathBuf>,
    manifest_file_name: Option<PathBuf>,
    ssh_key: Option<PathBuf>,
    ssh_passphrase: Option<String>,
    concurrency: Option<Option<NonZeroUsize>>,
}

impl EasyModulesBuilder {
    /// Project root directory.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Directory the modules are cloned into.
    ///
    /// Defaults to `modules`.
    pub fn modules_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.modules_directory = Some(path.into());
        self
    }

    /// Name of the JSON manifest with `dependencies` and `devDependencies`.
    ///
    /// Defaults to `modules.json`.
    pub fn manifest_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_file_name = Some(path.into());
        self
    }

    /// Private key used for every url that is not plain http(s).
    pub fn ssh_key(mut self, path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        self.ssh_key = Some(path.into());
        self.ssh_passphrase = passphrase;
        self
    }

    /// Maximum number of modules installed at once in parallel mode.
    ///
    /// Unlimited by default, `None` also means unlimited.
    pub fn concurrency(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.concurrency = Some(limit);
        self
    }

    /// Fills every setting not given explicitly from `config`.
    pub fn config(mut self, config: EasyModulesConfig) -> Self {
        self.modules_directory = self.modules_directory.or(config.modules_dir);
        self.manifest_file_name = self.manifest_file_name.or(config.manifest);
        if self.ssh_key.is_none() {
            self.ssh_key = config.ssh_key;
            self.ssh_passphrase = config.ssh_passphrase;
        }
        self.concurrency = self.concurrency.or(Some(config.concurrency));
        self
    }

    pub fn try_build(self) -> anyhow::Result<EasyModules> {
        let Self {
            root,
            modules_directory,
            manifest_file_name,
            ssh_key,
            ssh_passphrase,
            concurrency,
        } = self;
        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let modules_directory = modules_directory.unwrap_or_else(|| PathBuf::from("modules"));

        let manifest_file_name =
            manifest_file_name.unwrap_or_else(|| PathBuf::from("modules.json"));

        let installer = Installer::new(
            Git2Toolkit::new(SshCredentials::new(ssh_key, ssh_passphrase)),
            ModulesRoot::new(root.join(modules_directory)),
        );

        Ok(EasyModules {
            installer: Arc::new(installer),
            manifest_path: root.join(manifest_file_name),
            concurrency: concurrency.flatten(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_settings_win_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let easymodules = EasyModules::builder()
            .root(dir.path())
            .modules_directory("vendor")
            .config(EasyModulesConfig {
                modules_dir: Some("from_config".into()),
                manifest: Some("package.json".into()),
                concurrency: NonZeroUsize::new(3),
                ..Default::default()
            })
            .try_build()
            .unwrap();

        assert_eq!(
            easymodules.installer.modules().location(),
            dir.path().join("vendor")
        );
        assert_eq!(easymodules.manifest_path, dir.path().join("package.json"));
        assert_eq!(easymodules.concurrency, NonZeroUsize::new(3));
    }

    #[test]
    fn explicit_unlimited_concurrency_is_kept() {
        let easymodules = EasyModules::builder()
            .root("/project")
            .concurrency(None)
            .config(EasyModulesConfig {
                concurrency: NonZeroUsize::new(3),
                ..Default::default()
            })
            .try_build()
            .unwrap();

        assert_eq!(easymodules.concurrency, None);
    }

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let easymodules = EasyModules::builder().root(dir.path()).try_build().unwrap();

        assert_eq!(
            easymodules.installer.modules().location(),
            dir.path().join("modules")
        );
        assert_eq!(easymodules.manifest_path, dir.path().join("modules.json"));
        assert_eq!(easymodules.concurrency, None);
        assert!(!dir.path().join("modules").exists());
    }
}
