use log::{debug, info, warn};

use crate::{
    git::{GitAuth, GitError, VersionControl},
    model::specifier::{GitReference, ResolvedTarget},
    modules::ModuleDiskState,
};

use super::{InstallError, InstallOutcome, Installer};

impl<V: VersionControl> Installer<V> {
    /// Brings module `name` in line with `target`.
    ///
    /// - absent: clone
    /// - clean: delete, then clone
    /// - dirty: leave untouched and report the pending changes
    pub fn synchronize(
        &self,
        name: &str,
        target: &ResolvedTarget,
    ) -> Result<InstallOutcome, InstallError> {
        match self.modules.probe(&self.vcs, name)? {
            ModuleDiskState::Dirty(changes) => {
                warn!(
                    "There are unsaved changes for module \"{}\", skipping it\n\n{}",
                    name, changes
                );
                return Ok(InstallOutcome::SkippedDirty { changes });
            }
            ModuleDiskState::Clean => {
                debug!("Module {} has no local changes, reinstalling it", name);
                self.modules.remove_module(name)?;
            }
            ModuleDiskState::Absent => {}
        }

        let head = self.clone_module(name, target)?;
        Ok(InstallOutcome::Cloned { head })
    }

    fn clone_module(&self, name: &str, target: &ResolvedTarget) -> Result<String, InstallError> {
        let auth = self
            .vcs
            .auth_for(&target.clean_url)
            .map_err(|source| InstallError::git(name, source))?;

        info!(
            "Cloning repo={} url={} ({})",
            name, target.clean_url, target.reference
        );

        match self.checkout(name, target, &auth) {
            Ok(head) => {
                info!("Cloning successful repo={} head={}", name, head);
                Ok(head)
            }
            Err(source) => {
                // never leave a half cloned module behind
                if let Err(cleanup) = self.modules.remove_module(name) {
                    warn!("Could not roll back module {}: {}", name, cleanup);
                }
                Err(InstallError::git(name, source))
            }
        }
    }

    fn checkout(
        &self,
        name: &str,
        target: &ResolvedTarget,
        auth: &GitAuth,
    ) -> Result<String, GitError> {
        let default_branch = GitReference::DefaultBranch;
        let clone_reference = match &target.reference {
            GitReference::Commit(_) => &default_branch,
            reference => reference,
        };

        let path = self.modules.module_path(name);
        let repository =
            self.vcs
                .clone_repository(&target.clean_url, &path, clone_reference, auth)?;

        match &target.reference {
            GitReference::Commit(hash) => {
                self.vcs.checkout_commit(&repository, hash)?;
                Ok(hash.clone())
            }
            GitReference::Tag(tag) => Ok(tag.clone()),
            GitReference::Branch(_) | GitReference::DefaultBranch => {
                self.vcs.head_description(&repository)
            }
        }
    }
}
