mod sync;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    num::NonZeroUsize,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use log::{debug, error, info};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    git::{GitError, VersionControl},
    model::{
        specifier::{ModuleSpecifier, ResolvedTarget},
        ParseError,
    },
    modules::{validate_module_name, ModuleDiskState, ModulesRoot},
};

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Malformed specifier for module {module}: {source}")]
    Specifier { module: String, source: ParseError },
    #[error("Invalid module name `{0}`, expected a single directory name")]
    InvalidModuleName(String),
    #[error("Error while installing module {module}: {source}")]
    Git { module: String, source: GitError },
    #[error("Filesystem error on {path}: {source}")]
    Filesystem {
        path: String,
        source: std::io::Error,
    },
    #[error("Modules folder lock cannot be acquired: {0}")]
    Lock(#[from] crate::flock::Error),
    #[error("Install worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Install worker pool was closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),
}

impl InstallError {
    pub(crate) fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        InstallError::Filesystem {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn git(module: &str, source: GitError) -> Self {
        InstallError::Git {
            module: module.to_string(),
            source,
        }
    }
}

/// Result of synchronizing one module. Only used for reporting.
#[derive(Debug)]
pub enum InstallOutcome {
    Cloned { head: String },
    SkippedDirty { changes: String },
    SkippedNonGit,
    Failed(InstallError),
}

impl Display for InstallOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallOutcome::Cloned { head } => write!(f, "cloned, head={head}"),
            InstallOutcome::SkippedDirty { .. } => f.write_str("skipped, unsaved changes"),
            InstallOutcome::SkippedNonGit => f.write_str("skipped, not a git module"),
            InstallOutcome::Failed(error) => write!(f, "failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// One module at a time, in the order given.
    Sequential,
    /// One unit of work per module. `limit` bounds how many run at once,
    /// `None` lets every module run in parallel.
    Concurrent { limit: Option<NonZeroUsize> },
}

impl InstallMode {
    pub fn new(parallel: bool, limit: Option<NonZeroUsize>) -> Self {
        if parallel {
            InstallMode::Concurrent { limit }
        } else {
            InstallMode::Sequential
        }
    }
}

#[derive(Debug)]
pub struct InstallReport {
    pub count: usize,
    pub elapsed: Duration,
    pub outcomes: BTreeMap<String, InstallOutcome>,
}

impl InstallReport {
    pub fn cloned(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                InstallOutcome::Cloned { head } => Some((name.as_str(), head.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_dirty(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, InstallOutcome::SkippedDirty { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &InstallError)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                InstallOutcome::Failed(error) => Some((name.as_str(), error)),
                _ => None,
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }
}

/// Installs git modules into a modules root.
pub struct Installer<V> {
    vcs: V,
    modules: ModulesRoot,
}

impl<V: VersionControl> Installer<V> {
    pub fn new(vcs: V, modules: ModulesRoot) -> Self {
        Installer { vcs, modules }
    }

    pub fn modules(&self) -> &ModulesRoot {
        &self.modules
    }

    /// Synchronizes every module of `specifiers`.
    ///
    /// All specifiers are parsed before any module is touched, so a malformed
    /// one aborts the run up front. Failures while synchronizing a module are
    /// recorded in its outcome and do not stop the other modules.
    pub async fn install_all(
        self: &Arc<Self>,
        specifiers: &[ModuleSpecifier],
        mode: InstallMode,
    ) -> Result<InstallReport, InstallError> {
        let start = Instant::now();
        info!(
            "Installing {} modules into {}",
            specifiers.len(),
            self.modules.location().display()
        );

        let outcomes = Arc::new(DashMap::new());
        let mut targets = Vec::new();
        for specifier in specifiers {
            let name = &specifier.name;
            validate_module_name(name)?;
            match specifier
                .resolve()
                .map_err(|source| InstallError::Specifier {
                    module: name.clone(),
                    source,
                })? {
                Some(target) => targets.push((name.clone(), target)),
                None => {
                    debug!("Skipping {}, {} is not a git specifier", name, specifier.raw);
                    outcomes.insert(name.clone(), InstallOutcome::SkippedNonGit);
                }
            }
        }

        match mode {
            InstallMode::Sequential => {
                for (name, target) in targets {
                    let installer = Arc::clone(self);
                    let outcomes = Arc::clone(&outcomes);
                    tokio::task::spawn_blocking(move || installer.record(&outcomes, name, &target))
                        .await?;
                }
            }
            InstallMode::Concurrent { limit } => {
                let permits = limit.map(|limit| Arc::new(Semaphore::new(limit.get())));
                let mut units = JoinSet::new();
                for (name, target) in targets {
                    let permit = match &permits {
                        Some(permits) => Some(Arc::clone(permits).acquire_owned().await?),
                        None => None,
                    };
                    let installer = Arc::clone(self);
                    let outcomes = Arc::clone(&outcomes);
                    units.spawn_blocking(move || {
                        let _permit = permit;
                        installer.record(&outcomes, name, &target)
                    });
                }
                while let Some(unit) = units.join_next().await {
                    unit?;
                }
            }
        }

        let outcomes: BTreeMap<String, InstallOutcome> = specifiers
            .iter()
            .filter_map(|specifier| outcomes.remove(&specifier.name))
            .collect();
        let report = InstallReport {
            count: outcomes.len(),
            elapsed: start.elapsed(),
            outcomes,
        };
        info!(
            "Installation of {} modules took {:?}",
            report.count, report.elapsed
        );
        Ok(report)
    }

    /// Names of installed modules with uncommitted changes. Read only.
    pub fn changed_modules(&self) -> Result<Vec<String>, InstallError> {
        let mut changed = Vec::new();
        for name in self.modules.module_names()? {
            if let ModuleDiskState::Dirty(_) = self.modules.probe(&self.vcs, &name)? {
                changed.push(name);
            }
        }
        Ok(changed)
    }

    fn record(
        &self,
        outcomes: &DashMap<String, InstallOutcome>,
        name: String,
        target: &ResolvedTarget,
    ) {
        let outcome = self.synchronize(&name, target).unwrap_or_else(|error| {
            error!("{}", error);
            InstallOutcome::Failed(error)
        });
        outcomes.insert(name, outcome);
    }
}
