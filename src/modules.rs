use std::{
    fs::DirBuilder,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    time::Duration,
};

use log::{debug, info, warn};

use crate::{
    flock::FileLock,
    git::VersionControl,
    install::InstallError,
};

pub const LOCK_FILE_NAME: &str = ".easymodules.lock";
const LOCK_TIMEOUT: Duration = Duration::from_secs(300);
#[cfg(unix)]
const MODULES_DIR_MODE: u32 = 0o777;

/// What is on disk for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleDiskState {
    Absent,
    Clean,
    /// Carries the change summary reported by the working tree status.
    Dirty(String),
}

/// The directory holding one sub-directory per installed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulesRoot {
    location: PathBuf,
}

impl ModulesRoot {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        ModulesRoot {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn module_path(&self, name: &str) -> PathBuf {
        self.location.join(name)
    }

    /// Creates the modules root, and its parents, if it does not exist yet.
    pub fn create(&self) -> Result<(), InstallError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(MODULES_DIR_MODE);
        }
        builder
            .create(&self.location)
            .map_err(|source| InstallError::filesystem(&self.location, source))
    }

    /// Locks the modules root against other installer processes.
    pub fn lock(&self) -> Result<FileLock, InstallError> {
        let path = self.location.join(LOCK_FILE_NAME);
        debug!("Acquiring a lock on the modules root: {}", path.display());
        Ok(FileLock::acquire(&path, LOCK_TIMEOUT)?)
    }

    /// Deletes every module, keeping the root and its lock file.
    pub fn clear(&self) -> Result<(), InstallError> {
        let entries = match std::fs::read_dir(&self.location) {
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(()),
            otherwise => otherwise.map_err(|source| InstallError::filesystem(&self.location, source))?,
        };
        for entry in entries {
            let entry = entry.map_err(|source| InstallError::filesystem(&self.location, source))?;
            if entry.file_name() == LOCK_FILE_NAME {
                continue;
            }
            let path = entry.path();
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|source| InstallError::filesystem(&path, source))?;
        }
        warn!(
            "Modules folder {} cleared before installation",
            self.location.display()
        );
        Ok(())
    }

    /// Names of all module directories, sorted.
    pub fn module_names(&self) -> Result<Vec<String>, InstallError> {
        let entries = std::fs::read_dir(&self.location)
            .map_err(|source| InstallError::filesystem(&self.location, source))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| InstallError::filesystem(&self.location, source))?;
            let file_type = entry
                .file_type()
                .map_err(|source| InstallError::filesystem(entry.path(), source))?;
            if file_type.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Classifies the directory of module `name`.
    ///
    /// A missing directory is [`ModuleDiskState::Absent`]; any other failure
    /// to read it, or to get its working tree status, is an error.
    pub fn probe<V: VersionControl>(
        &self,
        vcs: &V,
        name: &str,
    ) -> Result<ModuleDiskState, InstallError> {
        let path = self.module_path(name);
        match std::fs::symlink_metadata(&path) {
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(ModuleDiskState::Absent),
            Err(source) => return Err(InstallError::filesystem(&path, source)),
            Ok(_) => {}
        }

        let changes = vcs
            .status(&path)
            .map_err(|source| InstallError::git(name, source))?;
        if changes.is_empty() {
            Ok(ModuleDiskState::Clean)
        } else {
            Ok(ModuleDiskState::Dirty(changes))
        }
    }

    /// Recursively deletes the directory of module `name`, if any.
    pub fn remove_module(&self, name: &str) -> Result<(), InstallError> {
        let path = self.module_path(name);
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                info!("Removed module folder {}", path.display());
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(InstallError::filesystem(&path, source)),
        }
    }
}

/// A module name must be a single plain path component so that every module
/// stays inside its own directory of the modules root.
pub fn validate_module_name(name: &str) -> Result<(), InstallError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None) if component == name => Ok(()),
        _ => Err(InstallError::InvalidModuleName(name.to_string())),
    }
}
