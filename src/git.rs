//! Git operations using a hybrid CLI + libgit2 approach.
//!
//! **CLI (with hardening) for operations that talk to a remote:**
//! - `clone` - uses whatever transports and credential helpers the system git has
//!
//! **libgit2 for local operations:**
//! - `open_repository` - clean API for opening existing repos
//! - `resolve_head` - efficient ref/commit reading
//! - `checkout_commit` - forced checkout plus detached HEAD

use git2::build::CheckoutBuilder;
use git2::{Oid, Repository};
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Errors returned by git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// libgit2 reported an error.
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
    /// Repository path does not contain a git repo.
    #[error("repository not found at {0}")]
    NotFound(String),
    /// Clone failed.
    #[error("clone failed: {0}")]
    CloneError(String),
    /// Underlying IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid inputs were provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Validate that a commit is a plain hex object id before it reaches libgit2.
///
/// Rejects:
/// - Empty strings
/// - Strings starting with `-` (could be interpreted as flags)
/// - Anything other than hex digits, which also rules out `..` and control characters
/// - Ids longer than a SHA-256 object id
fn validate_commit(commit: &str) -> Result<(), GitError> {
    if commit.is_empty() {
        return Err(GitError::InvalidInput("commit cannot be empty".into()));
    }
    if commit.starts_with('-') {
        return Err(GitError::InvalidInput("commit cannot start with '-'".into()));
    }
    if !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GitError::InvalidInput(format!(
            "commit {} is not a hex object id",
            commit
        )));
    }
    if commit.len() > 64 {
        return Err(GitError::InvalidInput(format!(
            "commit {} is longer than an object id",
            commit
        )));
    }
    Ok(())
}

/// Validate a remote URL before it reaches the command line.
fn validate_url(url: &str) -> Result<(), GitError> {
    if url.trim().is_empty() {
        return Err(GitError::InvalidInput("git_url cannot be empty".into()));
    }
    if url.starts_with('-') {
        return Err(GitError::InvalidInput(
            "git_url cannot start with '-'".into(),
        ));
    }
    if url.bytes().any(|b| b == 0 || b < 0x20) {
        return Err(GitError::InvalidInput(
            "git_url cannot contain null or control characters".into(),
        ));
    }
    Ok(())
}

/// Git CLI wrapper with security hardening.
pub struct GitCli {
    git_path: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Create a new GitCli instance using the system git.
    pub fn new() -> Self {
        Self {
            git_path: "git".into(),
        }
    }

    /// Create a hardened Command with security settings.
    ///
    /// Applies:
    /// - `GIT_TERMINAL_PROMPT=0` - disable interactive prompts
    /// - `core.hooksPath=` - disable hooks execution
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.git_path);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.args(["-c", "core.hooksPath="]);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Clone `url` into `dest` as a regular working copy with full history.
    ///
    /// If the clone fails and `dest` did not exist beforehand, whatever git
    /// left behind is removed.
    pub fn clone(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        validate_url(url)?;

        let dest_existed = dest.exists();

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let output = self
            .command()
            .args(["clone", "--quiet", "--"])
            .arg(url)
            .arg(dest)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !dest_existed {
                let _ = std::fs::remove_dir_all(dest);
            }
            return Err(GitError::CloneError(stderr.trim().to_string()));
        }

        Ok(())
    }

    /// Whether the configured git binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.git_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Open an existing repository at the given path.
pub fn open_repository(path: &Path) -> Result<Repository, GitError> {
    let repo = Repository::open(path).map_err(|e| {
        if e.code() == git2::ErrorCode::NotFound {
            GitError::NotFound(path.display().to_string())
        } else {
            GitError::Git(e)
        }
    })?;
    Ok(repo)
}

/// Resolve the commit HEAD currently points at.
pub fn resolve_head(repo: &Repository) -> Result<String, GitError> {
    let head = repo.head()?;
    let commit = head.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Check out `commit` on the working tree and detach HEAD at it.
///
/// The checkout is forced: tracked files are overwritten and files absent
/// from the target tree are removed.
pub fn checkout_commit(repo: &Repository, commit: &str) -> Result<Oid, GitError> {
    validate_commit(commit)?;

    let oid = Oid::from_str(commit)?;
    let target = repo.find_commit(oid)?;

    let mut opts = CheckoutBuilder::new();
    opts.force();
    repo.checkout_tree(target.as_object(), Some(&mut opts))?;
    repo.set_head_detached(target.id())?;

    Ok(target.id())
}
