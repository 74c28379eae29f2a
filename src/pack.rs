//! Run a pack: clone every configured repository, then archive the result.
//!
//! Repositories are cloned strictly one after another. Hosts such as GitHub
//! cap the number of open connections per client IP, so fanning out would
//! trade a faster run for throttled or refused clones.

use crate::archive::{self, ArchiveError, ArchiveSummary};
use crate::clone::{CloneError, ClonedRepo, Cloner};
use crate::config::{ConfigError, PackConfig};
use std::path::PathBuf;
use thiserror::Error;

/// One repository that could not be cloned.
#[derive(Debug)]
pub struct RepoFailure {
    pub clone_directory: String,
    pub error: CloneError,
}

/// Results of cloning every repository, in declaration order.
#[derive(Debug, Default)]
pub struct CloneReport {
    pub cloned: Vec<ClonedRepo>,
    pub failures: Vec<RepoFailure>,
}

impl CloneReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct PackOutcome {
    pub report: CloneReport,
    /// Present when archiving was enabled.
    pub archive: Option<ArchiveSummary>,
}

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum PackError {
    /// The configuration is invalid; nothing was cloned.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// At least one repository failed; archiving was skipped.
    #[error("{} of {} repositories failed to clone", .0.failures.len(), .0.failures.len() + .0.cloned.len())]
    CloneFailures(CloneReport),
    /// Every clone succeeded but the archive could not be built.
    #[error("archiving failed: {0}")]
    Archive(#[from] ArchiveError),
}

impl PackError {
    /// Process exit code for this class of failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            PackError::Config(_) => 2,
            PackError::CloneFailures(_) => 3,
            PackError::Archive(_) => 4,
        }
    }
}

/// Drives a pack relative to a working directory.
pub struct Packer {
    workdir: PathBuf,
    cloner: Cloner,
}

impl Packer {
    /// Create a packer resolving relative paths against `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            cloner: Cloner::new(),
        }
    }

    /// Validate, clone everything, then archive if enabled and nothing failed.
    pub fn run(&self, config: &PackConfig) -> Result<PackOutcome, PackError> {
        config.validate()?;

        let report = self.clone_all(config);
        if !report.is_success() {
            return Err(PackError::CloneFailures(report));
        }

        if !config.archive {
            return Ok(PackOutcome {
                report,
                archive: None,
            });
        }

        let output = config.archive_path();
        log::info!(
            "zipping {} into {}",
            config.root_dir().display(),
            output.display()
        );
        let summary = archive::zip_directory(&self.workdir, config.root_dir(), &output)?;

        Ok(PackOutcome {
            report,
            archive: Some(summary),
        })
    }

    /// Clone every repository in order. Failures are collected, not fatal.
    pub fn clone_all(&self, config: &PackConfig) -> CloneReport {
        let mut report = CloneReport::default();
        let total = config.repos.len();

        for (index, spec) in config.repos.iter().enumerate() {
            let dest = self.workdir.join(config.clone_destination(spec));
            log::info!(
                "[{}/{}] cloning {} into {}",
                index + 1,
                total,
                spec.git_url,
                dest.display()
            );

            match self.cloner.clone_repo(spec, &dest) {
                Ok(cloned) => report.cloned.push(cloned),
                Err(error) => {
                    log::error!("Cloning error {}", error);
                    report.failures.push(RepoFailure {
                        clone_directory: spec.clone_directory.clone(),
                        error,
                    });
                }
            }
        }

        report
    }
}
