use std::path::{Path, PathBuf};

use git2::{cert::Cert, CertificateCheckStatus};
use log::trace;
use ssh_key::{known_hosts::HostPatterns, KnownHosts};

use super::GitError;

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";
const SSH_USERNAME: &str = "git";

/// Credentials handed to a single clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitAuth {
    Anonymous,
    SshKey {
        private_key: PathBuf,
        passphrase: Option<String>,
    },
}

impl GitAuth {
    pub fn username() -> &'static str {
        SSH_USERNAME
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlTransport {
    Http,
    Local,
    Ssh,
}

impl UrlTransport {
    pub fn of(url: &str) -> UrlTransport {
        let lowercase = url.to_ascii_lowercase();
        if lowercase.starts_with("http://") || lowercase.starts_with("https://") {
            UrlTransport::Http
        } else if lowercase.starts_with("file://") {
            UrlTransport::Local
        } else {
            UrlTransport::Ssh
        }
    }
}

/// SSH key material, configured once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshCredentials {
    pub private_key: Option<PathBuf>,
    pub passphrase: Option<String>,
    pub known_hosts: Vec<PathBuf>,
}

impl SshCredentials {
    pub fn new(private_key: Option<PathBuf>, passphrase: Option<String>) -> Self {
        let mut known_hosts = Vec::new();
        if let Some(home) = home::home_dir() {
            known_hosts.push(home.join(".ssh").join("known_hosts"));
        }
        known_hosts.push(PathBuf::from(GLOBAL_KNOWN_HOSTS));
        SshCredentials {
            private_key,
            passphrase,
            known_hosts,
        }
    }

    /// Picks the authentication for `url`.
    ///
    /// Plain http(s) and local urls are anonymous. Everything else is ssh and
    /// fails when no usable key is configured.
    pub fn auth_for(&self, url: &str) -> Result<GitAuth, GitError> {
        match UrlTransport::of(url) {
            UrlTransport::Http | UrlTransport::Local => Ok(GitAuth::Anonymous),
            UrlTransport::Ssh => {
                let private_key = self
                    .private_key
                    .as_ref()
                    .ok_or_else(|| GitError::MissingSshKey {
                        url: url.to_string(),
                    })?;
                if !private_key.is_file() {
                    return Err(GitError::SshKeyNotFound {
                        url: url.to_string(),
                        path: private_key.display().to_string(),
                    });
                }
                trace!("Using ssh key {} for {}", private_key.display(), url);
                Ok(GitAuth::SshKey {
                    private_key: private_key.clone(),
                    passphrase: self.passphrase.clone(),
                })
            }
        }
    }

    pub(crate) fn check_certificate(
        &self,
        certificate: &Cert<'_>,
        host: &str,
    ) -> Result<CertificateCheckStatus, git2::Error> {
        if let Some(hostkey) = certificate.as_hostkey().and_then(|h| h.hostkey()) {
            for known_hosts in &self.known_hosts {
                if host_key_is_known(known_hosts, host, hostkey) {
                    return Ok(CertificateCheckStatus::CertificateOk);
                }
            }
            trace!("No known host entry matched the host key of {}", host);
        }
        Ok(CertificateCheckStatus::CertificatePassthrough)
    }
}

fn host_key_is_known(known_hosts: &Path, host: &str, hostkey: &[u8]) -> bool {
    trace!("Loading {}", known_hosts.display());
    match KnownHosts::read_file(known_hosts) {
        Ok(entries) => entries.iter().any(|entry| {
            host_matches_patterns(host, entry.host_patterns())
                && entry.public_key().to_bytes().as_deref() == Ok(hostkey)
        }),
        Err(error) => {
            trace!("Could not load {}: {}", known_hosts.display(), error);
            false
        }
    }
}

fn host_matches_patterns(host: &str, patterns: &HostPatterns) -> bool {
    match patterns {
        HostPatterns::Patterns(patterns) => {
            let mut match_found = false;
            for pattern in patterns {
                let pattern = pattern.to_lowercase();
                // * and ? wildcards are not yet supported
                if let Some(pattern) = pattern.strip_prefix('!') {
                    if pattern == host {
                        return false;
                    }
                } else {
                    match_found |= pattern == host;
                }
            }
            match_found
        }
        // Not yet supported
        HostPatterns::HashedName { .. } => false,
    }
}
