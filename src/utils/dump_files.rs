// dumprestore/src/utils/dump_files.rs
//! Discovery and loading of files in a `mongodump`-style tree:
//! `<dump root>/<database>/<collection>.bson[.gz]`.

use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use walkdir::WalkDir;

use crate::errors::{RestoreError, Result};

pub const DUMP_EXTENSION: &str = ".bson";
pub const GZIP_DUMP_EXTENSION: &str = ".bson.gz";

/// One entry directly below a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// A collection dump file and the collection it restores into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFile {
    pub collection: String,
    pub path: PathBuf,
}

/// Lists the entries directly inside `dir`, sorted by name.
///
/// Symlinks are followed, so a linked database folder counts as a directory.
pub fn list_directory_entries(dir: &Path) -> Result<Vec<DirectoryEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            RestoreError::io(path, e.into())
        })?;
        entries.push(DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().to_path_buf(),
            is_dir: entry.file_type().is_dir(),
        });
    }
    Ok(entries)
}

/// Collection name for a dump file name, or `None` if it is not a dump file.
pub fn collection_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(GZIP_DUMP_EXTENSION)
        .or_else(|| file_name.strip_suffix(DUMP_EXTENSION))
        .filter(|name| !name.is_empty())
}

/// Collection dump files directly inside a database directory.
///
/// Two files that restore into the same collection (`users.bson` next to
/// `users.bson.gz`) are a configuration error.
pub fn collection_files(dir: &Path) -> Result<Vec<DumpFile>> {
    let files: Vec<DumpFile> = list_directory_entries(dir)?
        .into_iter()
        .filter(|entry| !entry.is_dir)
        .filter_map(|entry| {
            collection_name(&entry.name).map(|collection| DumpFile {
                collection: collection.to_string(),
                path: entry.path.clone(),
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let duplicates: BTreeSet<&str> = files
        .iter()
        .map(|file| file.collection.as_str())
        .filter(|collection| !seen.insert(*collection))
        .collect();
    if !duplicates.is_empty() {
        return Err(RestoreError::Config(format!(
            "{} holds more than one dump file for collections [ {} ]",
            dir.display(),
            duplicates.into_iter().collect::<Vec<_>>().join(",")
        )));
    }
    Ok(files)
}

/// Database directories directly inside a dump root.
pub fn database_dirs(dir: &Path) -> Result<Vec<DirectoryEntry>> {
    Ok(list_directory_entries(dir)?
        .into_iter()
        .filter(|entry| entry.is_dir)
        .collect())
}

/// Reads a whole dump file into memory, gunzipping `.gz` files.
///
/// The file is loaded completely before any document is decoded, so memory use
/// grows with the size of the largest collection file.
pub async fn read_dump_file(path: &Path) -> Result<Vec<u8>> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| RestoreError::io(path, e))?;

    let is_gzip = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(".gz"));
    if !is_gzip {
        return Ok(raw);
    }

    let mut decoded = Vec::with_capacity(raw.len() * 4);
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut decoded)
        .map_err(|e| RestoreError::io(path, e))?;
    Ok(decoded)
}
