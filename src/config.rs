use std::{
    collections::HashMap,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "easymodules.toml";
const ENV_PREFIX: &str = "EASYMODULES";

/// Settings read once at startup from `easymodules.toml` and `EASYMODULES_*`
/// environment variables, the latter taking precedence.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EasyModulesConfig {
    pub modules_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub ssh_key: Option<PathBuf>,
    pub ssh_passphrase: Option<String>,
    /// `None` means no limit.
    pub concurrency: Option<NonZeroUsize>,
}

impl EasyModulesConfig {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let raw_config = RawConfig::load(Some(&root.join(CONFIG_FILE_NAME)), None)?;
        Ok(raw_config.into())
    }
}

impl From<RawConfig> for EasyModulesConfig {
    fn from(raw_config: RawConfig) -> Self {
        EasyModulesConfig {
            modules_dir: raw_config.modules.dir,
            manifest: raw_config.modules.manifest,
            ssh_key: raw_config.ssh.key.map(expand_home),
            ssh_passphrase: raw_config.ssh.passphrase,
            concurrency: raw_config.install.concurrency.and_then(NonZeroUsize::new),
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    modules: ModulesConfig,
    #[serde(default)]
    ssh: SshConfig,
    #[serde(default)]
    install: InstallConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct ModulesConfig {
    dir: Option<PathBuf>,
    manifest: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct SshConfig {
    key: Option<PathBuf>,
    passphrase: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct InstallConfig {
    concurrency: Option<usize>,
}

impl RawConfig {
    fn load(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

/// Replaces a leading `~` with the home directory.
fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), home::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}
