//! Pack configuration loaded from `pack.json`.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default config filename, looked up in the current directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "pack.json";

/// Suffix forced onto the archive filename.
pub const ZIP_SUFFIX: &str = ".zip";

/// Errors returned while loading or validating a pack config.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid JSON of the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The root clone directory is absolute.
    #[error("root_clone_directory {0} can not be an absolute path / begin with /")]
    InvalidRootPath(String),
    /// Archiving was requested without a filename.
    #[error("must specify archive_filename if archive is true")]
    MissingArchiveFilename,
}

/// One repository to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneSpec {
    /// Directory to clone into, relative to the root clone directory.
    /// Created if it does not exist.
    pub clone_directory: String,
    pub git_url: String,
    /// Commit to check out after cloning. Empty keeps the default branch tip.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub commit: String,
    /// Remove `.git` once the working tree is in place.
    pub shallow: bool,
}

impl CloneSpec {
    /// Returns the pinned commit, if any.
    pub fn pinned_commit(&self) -> Option<&str> {
        let commit = self.commit.trim();
        (!commit.is_empty()).then_some(commit)
    }
}

/// Parameters for one run of the packer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Top level directory every repo is cloned into.
    pub root_clone_directory: String,
    /// Repositories in clone order.
    pub repos: Vec<CloneSpec>,
    /// Whether to pack the root clone directory into a single zip.
    pub archive: bool,
    pub archive_filename: String,
}

impl PackConfig {
    /// Parse a config from a JSON document.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Check the invariants that must hold before any clone starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_rooted(&self.root_clone_directory) {
            return Err(ConfigError::InvalidRootPath(
                self.root_clone_directory.clone(),
            ));
        }
        if self.archive && self.archive_filename.trim().is_empty() {
            return Err(ConfigError::MissingArchiveFilename);
        }
        Ok(())
    }

    /// Root clone directory as a relative path.
    pub fn root_dir(&self) -> &Path {
        Path::new(&self.root_clone_directory)
    }

    /// Where `spec` gets cloned, relative to the working directory.
    ///
    /// Only the normal components of `clone_directory` are kept, so a
    /// leading `/`, `.` or `..` can not move the clone out of the root.
    pub fn clone_destination(&self, spec: &CloneSpec) -> PathBuf {
        let subdir: PathBuf = Path::new(&spec.clone_directory)
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        if self.root_clone_directory.is_empty() {
            subdir
        } else {
            self.root_dir().join(subdir)
        }
    }

    /// Archive filename with `.zip` appended when missing.
    pub fn archive_path(&self) -> PathBuf {
        let name = self.archive_filename.as_str();
        if name.ends_with(ZIP_SUFFIX) {
            PathBuf::from(name)
        } else {
            PathBuf::from(format!("{name}{ZIP_SUFFIX}"))
        }
    }
}

/// Load a pack config from `path`.
pub fn load(path: &Path) -> Result<PackConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    PackConfig::from_json(&contents)
}

fn is_rooted(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FULL: &str = r#"{
        "root_clone_directory": "packed",
        "repos": [
            {
                "clone_directory": "hello",
                "git_url": "https://github.com/octocat/Hello-World.git",
                "commit": "7fd1a60b01f91b314f59955a4e4d4e80d8edf11d",
                "shallow": true
            },
            {
                "clone_directory": "spoon",
                "git_url": "https://github.com/octocat/Spoon-Knife.git"
            }
        ],
        "archive": true,
        "archive_filename": "bundle"
    }"#;

    #[test]
    fn parses_full_document() {
        let config = PackConfig::from_json(FULL).expect("parse");

        assert_eq!(config.root_clone_directory, "packed");
        assert!(config.archive);
        assert_eq!(config.archive_filename, "bundle");
        assert_eq!(config.repos.len(), 2);
        assert_eq!(config.repos[0].clone_directory, "hello");
        assert!(config.repos[0].shallow);
        assert_eq!(
            config.repos[0].pinned_commit(),
            Some("7fd1a60b01f91b314f59955a4e4d4e80d8edf11d")
        );
        assert_eq!(config.repos[1].clone_directory, "spoon");
        assert_eq!(config.repos[1].pinned_commit(), None);
        assert!(!config.repos[1].shallow);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let config = PackConfig::from_json("{}").expect("parse");
        assert_eq!(config, PackConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config = PackConfig::from_json(
            r#"{"root_clone_directory": "out", "compression": "max", "repos": [{"git_url": "x", "depth": 3}]}"#,
        )
        .expect("parse");
        assert_eq!(config.root_clone_directory, "out");
        assert_eq!(config.repos[0].git_url, "x");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = PackConfig::from_json(r#"{"repos": "not a list"}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let result = PackConfig::from_json("{");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILENAME);

        match load(&path) {
            Err(ConfigError::Read { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected Read error, got: {:?}", other),
        }
    }

    #[test]
    fn load_reads_file_from_disk() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILENAME);
        std::fs::write(&path, FULL).expect("write config");

        let config = load(&path).expect("load");
        assert_eq!(config.repos.len(), 2);
    }

    #[test]
    fn validate_rejects_absolute_root() {
        let config = PackConfig {
            root_clone_directory: "/tmp/packed".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRootPath(root)) if root == "/tmp/packed"
        ));
    }

    #[test]
    fn validate_requires_archive_filename() {
        let mut config = PackConfig {
            root_clone_directory: "packed".into(),
            archive: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingArchiveFilename)
        ));

        config.archive_filename = "bundle".into();
        assert!(config.validate().is_ok());

        config.archive = false;
        config.archive_filename.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn archive_path_appends_zip_once() {
        let mut config = PackConfig {
            archive_filename: "bundle".into(),
            ..Default::default()
        };
        assert_eq!(config.archive_path(), PathBuf::from("bundle.zip"));

        config.archive_filename = "bundle.zip".into();
        assert_eq!(config.archive_path(), PathBuf::from("bundle.zip"));

        config.archive_filename = "release.tar".into();
        assert_eq!(config.archive_path(), PathBuf::from("release.tar.zip"));
    }

    #[test]
    fn clone_destination_joins_root() {
        let spec = CloneSpec {
            clone_directory: "hello".into(),
            ..Default::default()
        };

        let config = PackConfig {
            root_clone_directory: "packed".into(),
            ..Default::default()
        };
        assert_eq!(
            config.clone_destination(&spec),
            Path::new("packed").join("hello")
        );

        let config = PackConfig::default();
        assert_eq!(config.clone_destination(&spec), PathBuf::from("hello"));
    }

    #[test]
    fn clone_destination_stays_under_root() {
        let config = PackConfig {
            root_clone_directory: "packed".into(),
            ..Default::default()
        };

        for dir in ["/tmp/escaped", "../escaped", "./tmp/../escaped"] {
            let spec = CloneSpec {
                clone_directory: dir.into(),
                ..Default::default()
            };
            let dest = config.clone_destination(&spec);
            assert!(dest.starts_with("packed"), "{} escaped to {}", dir, dest.display());
            assert!(dest.ends_with("escaped"));
        }

        let spec = CloneSpec {
            clone_directory: "/tmp/escaped".into(),
            ..Default::default()
        };
        assert_eq!(
            PackConfig::default().clone_destination(&spec),
            Path::new("tmp").join("escaped")
        );
    }

    #[test]
    fn archive_path_keeps_name_verbatim() {
        let config = PackConfig {
            archive_filename: " bundle ".into(),
            ..Default::default()
        };
        assert_eq!(config.archive_path(), PathBuf::from(" bundle .zip"));
    }

    #[test]
    fn blank_commit_is_not_pinned() {
        let spec = CloneSpec {
            commit: "   ".into(),
            ..Default::default()
        };
        assert_eq!(spec.pinned_commit(), None);
    }
}
