// dumprestore/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::restore::{
    ArchiveRestoreOptions, DumpRestoreOptions, OnCollectionExists, RestorePolicy,
};
use crate::store::ConnectionSource;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "DUMPRESTORE_CONFIG";
pub const URI_ENV: &str = "MONGODB_URI";

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub uri: Option<String>,
    pub dump_path: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
    pub archive_dump_root: Option<PathBuf>,
    pub clean: Option<bool>,
    pub on_collection_exists: Option<String>,
}

/// Where the dump to restore comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpSource {
    Directory(PathBuf),
    Archive {
        path: PathBuf,
        dump_root: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub uri: String,
    pub source: DumpSource,
    pub policy: RestorePolicy,
}

impl RestoreConfig {
    pub fn dump_options(&self, path: &Path) -> DumpRestoreOptions {
        let mut options = DumpRestoreOptions::new(ConnectionSource::uri(&self.uri), path);
        options.policy = self.policy.clone();
        options
    }

    pub fn archive_options(&self, path: &Path, dump_root: Option<&Path>) -> ArchiveRestoreOptions {
        let mut options = ArchiveRestoreOptions::new(ConnectionSource::uri(&self.uri), path);
        options.dump_root = dump_root.map(Path::to_path_buf);
        options.policy = self.policy.clone();
        options
    }
}

/// Resolves the config file path from the environment, falling back to `config.json`.
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_raw_config(config_path: &Path) -> Result<RawJsonConfig> {
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
    serde_json::from_str(&config_content).with_context(|| {
        format!(
            "Failed to parse JSON from config file at {}",
            config_path.display()
        )
    })
}

/// Builds the restore configuration, taking the URI from `MONGODB_URI` when
/// the file does not set one.
pub fn load_restore_config_from_json(raw_config: &RawJsonConfig) -> Result<RestoreConfig> {
    resolve_restore_config(raw_config, env::var(URI_ENV).ok())
}

fn resolve_restore_config(
    raw_config: &RawJsonConfig,
    uri_from_env: Option<String>,
) -> Result<RestoreConfig> {
    let uri = raw_config
        .uri
        .clone()
        .filter(|uri| !uri.trim().is_empty())
        .or(uri_from_env.filter(|uri| !uri.trim().is_empty()))
        .with_context(|| format!("uri must be set in config.json or through {URI_ENV}"))?;

    let source = match (&raw_config.dump_path, &raw_config.archive_path) {
        (Some(_), Some(_)) => {
            anyhow::bail!("dump_path and archive_path cannot both be set in config.json")
        }
        (None, None) => anyhow::bail!("one of dump_path or archive_path must be set in config.json"),
        (Some(dump_path), None) => {
            if raw_config.archive_dump_root.is_some() {
                anyhow::bail!("archive_dump_root is only valid together with archive_path");
            }
            DumpSource::Directory(dump_path.clone())
        }
        (None, Some(archive_path)) => DumpSource::Archive {
            path: archive_path.clone(),
            dump_root: raw_config.archive_dump_root.clone(),
        },
    };

    let on_collection_exists = match raw_config.on_collection_exists.as_deref() {
        Some(value) => value
            .parse::<OnCollectionExists>()
            .context("Invalid on_collection_exists in config.json")?,
        None => OnCollectionExists::Throw,
    };

    Ok(RestoreConfig {
        uri,
        source,
        policy: RestorePolicy {
            clean: raw_config.clean.unwrap_or(true),
            on_collection_exists,
        },
    })
}
