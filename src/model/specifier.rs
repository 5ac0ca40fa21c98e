use std::{
    fmt::{Display, Formatter},
    sync::OnceLock,
};

use log::debug;
use regex_lite::Regex;

use crate::model::ParseError;

const REFERENCE_SEPARATOR: char = '#';
const GIT_MARKER: &str = "git";
const COMMIT_HASH_LENGTH: usize = 40;

/// A digit followed, somewhere later, by at least one `.`.
const TAG_PATTERN: &str = r"\d(\..*)+";

/// One entry of the dependency mapping: a module name and its raw specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ModuleSpecifier {
    pub name: String,
    pub raw: String,
}

impl ModuleSpecifier {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        ModuleSpecifier {
            name: name.into(),
            raw: raw.into(),
        }
    }

    pub fn resolve(&self) -> Result<Option<ResolvedTarget>, ParseError> {
        parse_specifier(&self.raw)
    }
}

/// The branch, tag or commit a module is synchronized to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum GitReference {
    /// No reference given, the remote's default branch is used.
    #[default]
    DefaultBranch,
    Branch(String),
    Tag(String),
    Commit(String),
}

impl Display for GitReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GitReference::DefaultBranch => f.write_str("default branch"),
            GitReference::Branch(name) => write!(f, "branch={name}"),
            GitReference::Tag(name) => write!(f, "tag={name}"),
            GitReference::Commit(hash) => write!(f, "commit={hash}"),
        }
    }
}

/// Clone target derived from a git specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedTarget {
    pub clean_url: String,
    pub reference: GitReference,
}

impl Display for ResolvedTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.clean_url, self.reference)
    }
}

/// Loose check used to tell git-backed modules apart from registry versions.
///
/// Matches both `https://host/x.git` and `git@host:x.git` forms, and anything
/// else containing `git`.
pub fn is_git_specifier(raw: &str) -> bool {
    raw.contains(GIT_MARKER)
}

/// Splits a raw specifier into a clean url and a reference.
///
/// Returns `Ok(None)` when `raw` is not a git specifier, meaning there is
/// nothing to install. At most one `#` is allowed and the reference after it
/// must not be empty.
pub fn parse_specifier(raw: &str) -> Result<Option<ResolvedTarget>, ParseError> {
    if !is_git_specifier(raw) {
        return Ok(None);
    }

    let mut parts = raw.split(REFERENCE_SEPARATOR);
    let clean_url = parts.next().unwrap_or_default().to_string();

    let reference = match (parts.next(), parts.next()) {
        (None, _) => GitReference::DefaultBranch,
        (Some(_), Some(_)) => return Err(ParseError::MultipleSeparators(raw.to_string())),
        (Some(""), None) => return Err(ParseError::EmptyReference(raw.to_string())),
        (Some(fragment), None) => {
            let reference = classify_reference(fragment);
            debug!("Parsed {} from {}", reference, raw);
            reference
        }
    };

    Ok(Some(ResolvedTarget {
        clean_url,
        reference,
    }))
}

/// Classifies a non-empty reference fragment.
///
/// This is a heuristic: no remote is queried, so a branch named like a dotted
/// version (`2.0`) is reported as a tag.
pub fn classify_reference(fragment: &str) -> GitReference {
    if tag_regex().is_match(fragment) {
        GitReference::Tag(fragment.to_string())
    } else if is_commit_hash(fragment) {
        GitReference::Commit(fragment.to_string())
    } else {
        GitReference::Branch(fragment.to_string())
    }
}

fn is_commit_hash(fragment: &str) -> bool {
    fragment.len() == COMMIT_HASH_LENGTH && fragment.chars().all(|c| c.is_ascii_hexdigit())
}

fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| Regex::new(TAG_PATTERN).expect("tag pattern is a valid regex"))
}
