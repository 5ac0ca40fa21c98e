pub mod auth;
pub mod toolkit;

use std::path::Path;

use thiserror::Error;

use crate::model::specifier::GitReference;

pub use auth::{GitAuth, SshCredentials};
pub use toolkit::Git2Toolkit;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git error: {0}")]
    Transport(#[from] git2::Error),
    #[error("Url {url} needs ssh authentication but no ssh key is configured")]
    MissingSshKey { url: String },
    #[error("Ssh key {path} configured for {url} does not exist")]
    SshKeyNotFound { url: String, path: String },
    #[error("Tag {tag} was not found in {url}")]
    TagNotFound { url: String, tag: String },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

impl GitError {
    /// Whether the error comes from missing or unusable key material.
    pub fn is_auth_configuration(&self) -> bool {
        matches!(
            self,
            GitError::MissingSshKey { .. } | GitError::SshKeyNotFound { .. }
        )
    }
}

/// The version control operations the installer relies on.
///
/// Implemented by [`Git2Toolkit`] for real repositories; tests plug in an
/// in-memory implementation.
pub trait VersionControl: Send + Sync + 'static {
    type Repository;

    /// Clones `url` into `target` and checks out `reference`.
    ///
    /// `GitReference::Commit` is not handled here, callers clone the default
    /// branch and use [`VersionControl::checkout_commit`].
    /// Authentication for cloning `url`, failing when it needs a key that is
    /// not configured.
    fn auth_for(&self, url: &str) -> Result<GitAuth, GitError>;

    fn clone_repository(
        &self,
        url: &str,
        target: &Path,
        reference: &GitReference,
        auth: &GitAuth,
    ) -> Result<Self::Repository, GitError>;

    fn checkout_commit(&self, repository: &Self::Repository, hash: &str) -> Result<(), GitError>;

    /// Summary of uncommitted changes in the working tree at `path`, empty when clean.
    fn status(&self, path: &Path) -> Result<String, GitError>;

    /// Branch checked out in `repository`, or the commit hash when HEAD is detached.
    fn head_description(&self, repository: &Self::Repository) -> Result<String, GitError>;
}
