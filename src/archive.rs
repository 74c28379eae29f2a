//! Pack a directory tree into a single zip file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors returned while building an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// No directory to archive.
    #[error("cannot archive an empty root directory name")]
    EmptyRoot,
    /// The archive file could not be created.
    #[error("creating {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Walking the directory tree failed.
    #[error("walking directory: {0}")]
    Walk(#[from] walkdir::Error),
    /// A file could not be opened or inspected.
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Copying file contents into the archive failed.
    #[error("writing {} into archive: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The zip writer rejected an entry or could not finish.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// What ended up in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub files: usize,
    pub bytes: u64,
}

/// Zip every regular file under `base/directory` into `base/output`.
///
/// Entry names are the walk paths relative to `base`, so they start with
/// `directory` itself. Directories and symlinks get no entries. The archive
/// is overwritten if it exists and left as-is on failure.
pub fn zip_directory(
    base: &Path,
    directory: &Path,
    output: &Path,
) -> Result<ArchiveSummary, ArchiveError> {
    if directory.as_os_str().is_empty() {
        return Err(ArchiveError::EmptyRoot);
    }

    let walk_root = base.join(directory);
    let output_path = base.join(output);

    let file = File::create(&output_path).map_err(|source| ArchiveError::Create {
        path: output_path.clone(),
        source,
    })?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    let mut summary = ArchiveSummary {
        path: output_path.clone(),
        files: 0,
        bytes: 0,
    };

    for entry in WalkDir::new(&walk_root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        log::debug!("Crawling: {}", path.display());

        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                log::warn!("skipping symlink {}", path.display());
            }
            continue;
        }
        if path == output_path {
            continue;
        }

        let metadata = entry.metadata()?;

        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(metadata.len() >= u64::from(u32::MAX));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options = options.unix_permissions(metadata.permissions().mode());
        }

        let mut input = File::open(path).map_err(|source| ArchiveError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        writer.start_file(entry_name(path, base), options)?;
        let copied = io::copy(&mut input, &mut writer).map_err(|source| ArchiveError::Copy {
            path: path.to_path_buf(),
            source,
        })?;

        summary.files += 1;
        summary.bytes += copied;
    }

    writer
        .finish()?
        .flush()
        .map_err(|source| ArchiveError::Copy {
            path: output_path.clone(),
            source,
        })?;
    log::info!(
        "archived {} files ({} bytes) into {}",
        summary.files,
        summary.bytes,
        summary.path.display()
    );

    Ok(summary)
}

/// Zip entry name for `path`: relative to `base`, `/`-separated.
///
/// `.` and `..` components are dropped so no entry can extract outside the
/// target directory.
fn entry_name(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
