//! Clone a single repository, pin it, and optionally strip its metadata.

use crate::config::CloneSpec;
use crate::git::{self, GitCli, GitError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the metadata directory removed in shallow mode.
pub const GIT_METADATA_DIR: &str = ".git";

/// Errors returned while cloning one repository.
#[derive(Error, Debug)]
pub enum CloneError {
    /// Fetching the repository failed.
    #[error("cloning {url} into {}: {source}", path.display())]
    Clone {
        url: String,
        path: PathBuf,
        #[source]
        source: GitError,
    },
    /// HEAD of the fresh clone could not be resolved.
    #[error("resolving HEAD in {}: {source}", path.display())]
    CommitResolution {
        path: PathBuf,
        #[source]
        source: GitError,
    },
    /// The pinned commit could not be checked out.
    #[error("checking out {commit} in {}: {source}", path.display())]
    Checkout {
        commit: String,
        path: PathBuf,
        #[source]
        source: GitError,
    },
    /// The metadata directory could not be removed.
    #[error("removing {}: {source}", path.display())]
    MetadataRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A repository that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedRepo {
    pub path: PathBuf,
    /// HEAD right after cloning, before any checkout. Only resolved for
    /// pinned repos.
    pub head: Option<String>,
    /// Commit checked out on the working tree, if one was pinned.
    pub checked_out: Option<String>,
    /// Whether `.git` was removed.
    pub stripped: bool,
}

/// Clones repositories one at a time through the git CLI.
pub struct Cloner {
    git: GitCli,
}

impl Default for Cloner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cloner {
    pub fn new() -> Self {
        Self::with_git(GitCli::new())
    }

    pub fn with_git(git: GitCli) -> Self {
        Self { git }
    }

    /// Clone `spec` into `dest`.
    ///
    /// Pinned commits are checked out before metadata is stripped, since the
    /// checkout needs the object database.
    pub fn clone_repo(&self, spec: &CloneSpec, dest: &Path) -> Result<ClonedRepo, CloneError> {
        log::info!("git clone {} {}", spec.git_url, dest.display());
        self.git
            .clone(&spec.git_url, dest)
            .map_err(|source| CloneError::Clone {
                url: spec.git_url.clone(),
                path: dest.to_path_buf(),
                source,
            })?;

        let mut cloned = ClonedRepo {
            path: dest.to_path_buf(),
            head: None,
            checked_out: None,
            stripped: false,
        };

        if let Some(commit) = spec.pinned_commit() {
            let (head, oid) = checkout_pinned(dest, commit)?;
            cloned.head = Some(head);
            cloned.checked_out = Some(oid);
        }

        if spec.shallow {
            strip_metadata(dest)?;
            cloned.stripped = true;
        }

        Ok(cloned)
    }
}

fn checkout_pinned(dest: &Path, commit: &str) -> Result<(String, String), CloneError> {
    let resolution = |source: GitError| CloneError::CommitResolution {
        path: dest.to_path_buf(),
        source,
    };

    log::info!("git show-ref --head HEAD");
    let repo = git::open_repository(dest).map_err(resolution)?;
    let head = git::resolve_head(&repo).map_err(resolution)?;
    log::info!("{}", head);

    log::info!("git checkout {}", commit);
    let oid = git::checkout_commit(&repo, commit).map_err(|source| CloneError::Checkout {
        commit: commit.to_string(),
        path: dest.to_path_buf(),
        source,
    })?;

    Ok((head, oid.to_string()))
}

/// Remove the `.git` directory under `dest`. A missing directory is fine.
pub fn strip_metadata(dest: &Path) -> Result<(), CloneError> {
    let metadata = dest.join(GIT_METADATA_DIR);
    log::info!("removing {}", metadata.display());

    match std::fs::remove_dir_all(&metadata) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("{} already absent", metadata.display());
            Ok(())
        }
        Err(source) => Err(CloneError::MetadataRemoval {
            path: metadata,
            source,
        }),
    }
}
