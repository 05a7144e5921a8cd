// dumprestore/src/restore/archive.rs
use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tempfile::TempDir;
use tracing::info;

use super::RestoreSummary;
use super::dump::restore_dump_with;
use super::options::ArchiveRestoreOptions;
use crate::errors::{RestoreError, Result};
use crate::store::DocumentStore;

/// Extracts a GZipped TAR archive into `extract_to_dir`.
///
/// # Arguments
/// * `archive_path` - Path to the `.tar.gz` archive file.
/// * `extract_to_dir` - Existing directory the contents are unpacked into.
pub fn extract_tar_gz_archive(archive_path: &Path, extract_to_dir: &Path) -> Result<()> {
    if !archive_path.is_file() {
        return Err(RestoreError::Config(format!(
            "archive for extraction is not a file: {}",
            archive_path.display()
        )));
    }

    info!(
        "Extracting tar.gz archive from {} to {}",
        archive_path.display(),
        extract_to_dir.display()
    );

    let archive_file = File::open(archive_path).map_err(|e| RestoreError::io(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(archive_file));
    archive
        .unpack(extract_to_dir)
        .map_err(|e| RestoreError::io(archive_path, e))?;
    Ok(())
}

/// Unpacks the archive into a temporary directory and restores the dump inside it.
///
/// The temporary directory is removed when this returns, whatever the outcome.
pub(crate) async fn restore_archive_with(
    store: &dyn DocumentStore,
    options: &ArchiveRestoreOptions,
) -> Result<RestoreSummary> {
    let scratch = tempfile::Builder::new()
        .prefix("dumprestore_")
        .tempdir()
        .map_err(|e| RestoreError::io(std::env::temp_dir(), e))?;

    let archive = options.archive.clone();
    let target = scratch.path().to_path_buf();
    tokio::task::spawn_blocking(move || extract_tar_gz_archive(&archive, &target))
        .await
        .map_err(|e| RestoreError::io(&options.archive, std::io::Error::other(e)))??;

    let dump_root = resolve_dump_root(&scratch, options.dump_root.as_deref());
    if !dump_root.is_dir() {
        return Err(RestoreError::Config(format!(
            "dump root {} was not found inside {}",
            options.dump_root.as_deref().unwrap_or(Path::new(".")).display(),
            options.archive.display()
        )));
    }

    restore_dump_with(
        store,
        &dump_root,
        &options.policy,
        options.filter.as_deref(),
        options.transform.as_deref(),
    )
    .await
}

fn resolve_dump_root(scratch: &TempDir, relative: Option<&Path>) -> std::path::PathBuf {
    match relative {
        Some(relative) => scratch.path().join(relative),
        None => scratch.path().to_path_buf(),
    }
}
