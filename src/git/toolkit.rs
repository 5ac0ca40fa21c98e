use std::path::Path;

use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    AutotagOption, Commit, Cred, CredentialType, ErrorCode, FetchOptions, Oid, RemoteCallbacks,
    Repository, Status, StatusOptions,
};
use log::{debug, trace};

use crate::model::specifier::GitReference;

use super::{GitAuth, GitError, SshCredentials, VersionControl};

/// [`VersionControl`] backed by libgit2.
#[derive(Debug, Clone, Default)]
pub struct Git2Toolkit {
    credentials: SshCredentials,
}

impl Git2Toolkit {
    pub fn new(credentials: SshCredentials) -> Self {
        Git2Toolkit { credentials }
    }

    fn fetch_options<'a>(&'a self, auth: &'a GitAuth) -> FetchOptions<'a> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed_types| {
            trace!(
                "Requested credentials for {}, username {:?}, allowed types {:?}",
                url,
                username,
                allowed_types
            );
            // Asking for ssh username
            if allowed_types.contains(CredentialType::USERNAME) {
                return Cred::username(GitAuth::username());
            }
            match auth {
                GitAuth::SshKey {
                    private_key,
                    passphrase,
                } if allowed_types.contains(CredentialType::SSH_KEY) => Cred::ssh_key(
                    username.unwrap_or(GitAuth::username()),
                    None,
                    private_key,
                    passphrase.as_deref(),
                ),
                _ => Err(git2::Error::from_str("no valid authentication available")),
            }
        });

        callbacks.certificate_check(move |certificate, host| {
            self.credentials.check_certificate(certificate, host)
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(callbacks)
            .download_tags(AutotagOption::All);

        fetch_options
    }
}

impl VersionControl for Git2Toolkit {
    type Repository = Repository;

    fn auth_for(&self, url: &str) -> Result<GitAuth, GitError> {
        self.credentials.auth_for(url)
    }

    fn clone_repository(
        &self,
        url: &str,
        target: &Path,
        reference: &GitReference,
        auth: &GitAuth,
    ) -> Result<Repository, GitError> {
        let mut builder = RepoBuilder::new();
        builder.fetch_options(self.fetch_options(auth));
        if let GitReference::Branch(branch) = reference {
            builder.branch(branch);
        }

        debug!("Cloning {} at {} into {}", url, reference, target.display());
        let repository = builder.clone(url, target)?;

        // libgit2 can only check out branches while cloning
        if let GitReference::Tag(tag) = reference {
            let commit = repository
                .find_reference(&format!("refs/tags/{tag}"))
                .and_then(|tag_ref| tag_ref.peel_to_commit())
                .map_err(|error| match error.code() {
                    ErrorCode::NotFound => GitError::TagNotFound {
                        url: url.to_string(),
                        tag: tag.to_string(),
                    },
                    _ => error.into(),
                })?;
            detach_head_at(&repository, &commit)?;
        }

        Ok(repository)
    }

    fn checkout_commit(&self, repository: &Repository, hash: &str) -> Result<(), GitError> {
        let commit = repository.find_commit(Oid::from_str(hash)?)?;
        detach_head_at(repository, &commit)?;
        debug!("Checked out commit {}", hash);
        Ok(())
    }

    fn status(&self, path: &Path) -> Result<String, GitError> {
        let repository = Repository::open(path)?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = repository.statuses(Some(&mut options))?;
        let mut changes: Vec<(String, String)> = statuses
            .iter()
            .map(|entry| {
                (
                    String::from_utf8_lossy(entry.path_bytes()).to_string(),
                    status_code(entry.status()),
                )
            })
            .collect();
        changes.sort();

        Ok(changes
            .into_iter()
            .map(|(path, code)| format!("{code} {path}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn head_description(&self, repository: &Repository) -> Result<String, GitError> {
        let head = repository.head()?;
        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(name.to_string());
            }
        }
        Ok(head.peel_to_commit()?.id().to_string())
    }
}

fn detach_head_at(repository: &Repository, commit: &Commit<'_>) -> Result<(), GitError> {
    repository.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repository.set_head_detached(commit.id())?;
    Ok(())
}

/// Two letter `git status --short` style code: index state, then worktree state.
fn status_code(status: Status) -> String {
    if status.is_conflicted() {
        return "UU".to_string();
    }
    let index = if status.is_index_new() {
        'A'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_typechange() {
        'T'
    } else {
        ' '
    };
    let worktree = if status.is_wt_new() {
        '?'
    } else if status.is_wt_modified() {
        'M'
    } else if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else {
        ' '
    };
    match (index, worktree) {
        (' ', '?') => "??".to_string(),
        (index, worktree) => format!("{index}{worktree}"),
    }
}
