//! Test doubles: local upstream repositories and an in-memory version control.

use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

use crate::{
    git::{GitAuth, GitError, SshCredentials, VersionControl},
    model::specifier::GitReference,
};

/// A real repository on disk, reachable through a `file://` url.
///
/// History: `first_commit` (tagged [`Upstream::TAG`]) <- `main_tip` on `main`,
/// and `first_commit` <- `dev_tip` on `dev`.
pub(crate) struct Upstream {
    _dir: TempDir,
    path: PathBuf,
    pub first_commit: Oid,
    pub main_tip: Oid,
    pub dev_tip: Oid,
}

impl Upstream {
    pub const FILE: &'static str = "README.md";
    pub const TAG: &'static str = "1.0.0";

    pub fn create() -> Upstream {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upstream.git");
        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repository = Repository::init_opts(&path, &options).unwrap();

        let first_commit = commit(&repository, "HEAD", Self::FILE, "first", &[]);
        repository
            .tag_lightweight(
                Self::TAG,
                &repository.find_object(first_commit, None).unwrap(),
                false,
            )
            .unwrap();
        let main_tip = commit(&repository, "HEAD", Self::FILE, "second", &[first_commit]);
        let dev_tip = commit(&repository, "refs/heads/dev", "dev.txt", "dev", &[first_commit]);

        Upstream {
            _dir: dir,
            path,
            first_commit,
            main_tip,
            dev_tip,
        }
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

fn commit(
    repository: &Repository,
    update_ref: &str,
    file: &str,
    message: &str,
    parents: &[Oid],
) -> Oid {
    let workdir = repository.workdir().unwrap();
    std::fs::write(workdir.join(file), message).unwrap();
    let mut index = repository.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repository.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("easymodules", "easymodules@example.com").unwrap();
    let parents: Vec<Commit> = parents
        .iter()
        .map(|id| repository.find_commit(*id).unwrap())
        .collect();
    let parents: Vec<&Commit> = parents.iter().collect();
    repository
        .commit(
            Some(update_ref),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )
        .unwrap()
}

const FAKE_HEAD: &str = ".fake-head";

/// What a fake remote has to offer.
#[derive(Debug, Clone)]
pub(crate) struct FakeRemote {
    default_branch: String,
    branches: BTreeSet<String>,
    tags: BTreeSet<String>,
    commits: BTreeSet<String>,
}

impl FakeRemote {
    pub fn new(default_branch: &str) -> Self {
        FakeRemote {
            default_branch: default_branch.to_string(),
            branches: BTreeSet::from([default_branch.to_string()]),
            tags: BTreeSet::new(),
            commits: BTreeSet::new(),
        }
    }

    pub fn branch(mut self, name: &str) -> Self {
        self.branches.insert(name.to_string());
        self
    }

    pub fn tag(mut self, name: &str) -> Self {
        self.tags.insert(name.to_string());
        self
    }

    pub fn commit(mut self, hash: &str) -> Self {
        self.commits.insert(hash.to_string());
        self
    }
}

pub(crate) struct FakeRepository {
    path: PathBuf,
    remote: FakeRemote,
}

/// Clones are directories holding a single `.fake-head` file; any other file
/// in them counts as an untracked change.
#[derive(Default)]
pub(crate) struct FakeVcs {
    remotes: HashMap<String, FakeRemote>,
    credentials: SshCredentials,
    clone_delay: Duration,
    clones: Mutex<Vec<GitReference>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeVcs {
    pub fn with_remote(mut self, url: &str, remote: FakeRemote) -> Self {
        self.remotes.insert(url.to_string(), remote);
        self
    }

    pub fn with_clone_delay(mut self, delay: Duration) -> Self {
        self.clone_delay = delay;
        self
    }

    pub fn clone_count(&self) -> usize {
        self.clones.lock().unwrap().len()
    }

    pub fn clone_references(&self) -> Vec<GitReference> {
        self.clones.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn write_checkout(path: &Path, head: &str) {
        std::fs::create_dir_all(path).unwrap();
        std::fs::write(path.join(FAKE_HEAD), head).unwrap();
    }
}

impl VersionControl for FakeVcs {
    type Repository = FakeRepository;

    fn auth_for(&self, url: &str) -> Result<GitAuth, GitError> {
        self.credentials.auth_for(url)
    }

    fn clone_repository(
        &self,
        url: &str,
        target: &Path,
        reference: &GitReference,
        _auth: &GitAuth,
    ) -> Result<FakeRepository, GitError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        std::thread::sleep(self.clone_delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.clones.lock().unwrap().push(reference.clone());

        let remote = self
            .remotes
            .get(url)
            .ok_or_else(|| git2::Error::from_str("repository not found"))?;
        let head = match reference {
            GitReference::DefaultBranch => remote.default_branch.clone(),
            GitReference::Branch(branch) if remote.branches.contains(branch) => branch.clone(),
            GitReference::Branch(_) => {
                return Err(git2::Error::from_str("remote branch not found").into())
            }
            GitReference::Tag(tag) => {
                // the default branch is on disk before the tag lookup fails
                Self::write_checkout(target, &remote.default_branch);
                if !remote.tags.contains(tag) {
                    return Err(GitError::TagNotFound {
                        url: url.to_string(),
                        tag: tag.clone(),
                    });
                }
                tag.clone()
            }
            GitReference::Commit(_) => {
                return Err(git2::Error::from_str("commits cannot be cloned").into())
            }
        };

        Self::write_checkout(target, &head);
        Ok(FakeRepository {
            path: target.to_path_buf(),
            remote: remote.clone(),
        })
    }

    fn checkout_commit(&self, repository: &FakeRepository, hash: &str) -> Result<(), GitError> {
        if !repository.remote.commits.contains(hash) {
            return Err(git2::Error::from_str("commit not found").into());
        }
        Self::write_checkout(&repository.path, hash);
        Ok(())
    }

    fn status(&self, path: &Path) -> Result<String, GitError> {
        if !path.join(FAKE_HEAD).is_file() {
            return Err(git2::Error::from_str("could not find repository").into());
        }
        let mut changes = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name != FAKE_HEAD {
                changes.push(format!("?? {name}"));
            }
        }
        changes.sort();
        Ok(changes.join("\n"))
    }

    fn head_description(&self, repository: &FakeRepository) -> Result<String, GitError> {
        Ok(std::fs::read_to_string(repository.path.join(FAKE_HEAD))?)
    }
}
