// dumprestore/src/restore/options.rs
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use bson::Document;
use serde::Serialize;

use crate::errors::{RestoreError, Result};
use crate::store::ConnectionSource;

pub type DocumentFilter = Arc<dyn Fn(&Document) -> bool + Send + Sync>;
pub type DocumentTransform = Arc<dyn Fn(Document) -> Document + Send + Sync>;
pub type CollectionTransform = Arc<dyn Fn(Document, &CollectionContext) -> Document + Send + Sync>;
pub type DatabaseTransform = Arc<dyn Fn(Document, &DatabaseContext) -> Document + Send + Sync>;
pub type CollectionExistsHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// What to do when a destination collection already exists.
#[derive(Clone, Default)]
pub enum OnCollectionExists {
    /// Fail with `CollectionsExist` before touching anything.
    #[default]
    Throw,
    /// Keep the existing collection and restore into it.
    Overwrite,
    /// Call the handler once per colliding name, then proceed as `Overwrite`.
    Notify(CollectionExistsHandler),
}

impl OnCollectionExists {
    pub fn notify<F>(handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        OnCollectionExists::Notify(Arc::new(handler))
    }

    /// Policy for per-collection checks that run after a batch check has
    /// already reported every collision.
    pub(crate) fn after_batch_check(&self) -> Self {
        match self {
            OnCollectionExists::Notify(_) => OnCollectionExists::Overwrite,
            other => other.clone(),
        }
    }
}

impl fmt::Debug for OnCollectionExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnCollectionExists::Throw => f.write_str("Throw"),
            OnCollectionExists::Overwrite => f.write_str("Overwrite"),
            OnCollectionExists::Notify(_) => f.write_str("Notify(..)"),
        }
    }
}

impl FromStr for OnCollectionExists {
    type Err = RestoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "throw" => Ok(OnCollectionExists::Throw),
            "overwrite" => Ok(OnCollectionExists::Overwrite),
            other => Err(RestoreError::Config(format!(
                "when set, on_collection_exists should be either \"throw\" or \"overwrite\", got {other:?}"
            ))),
        }
    }
}

/// Clean and existence behaviour shared by every restore level.
#[derive(Debug, Clone)]
pub struct RestorePolicy {
    /// Delete the destination collection's contents before inserting.
    pub clean: bool,
    pub on_collection_exists: OnCollectionExists,
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self {
            clean: true,
            on_collection_exists: OnCollectionExists::Throw,
        }
    }
}

/// Passed to database-level transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionContext {
    pub collection: String,
}

/// Passed to dump-level transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseContext {
    pub database: String,
}

fn require(value: &str, option: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RestoreError::Config(format!("missing \"{option}\" option")));
    }
    Ok(())
}

fn require_path(path: &std::path::Path, option: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(RestoreError::Config(format!("missing \"{option}\" option")));
    }
    Ok(())
}

/// Restore an in-memory buffer of BSON documents into one collection.
#[derive(Clone)]
pub struct BufferRestoreOptions {
    pub connection: ConnectionSource,
    pub database: String,
    pub collection: String,
    pub from: Vec<u8>,
    pub limit: Option<usize>,
    pub policy: RestorePolicy,
    pub filter: Option<DocumentFilter>,
    pub transform: Option<DocumentTransform>,
}

impl BufferRestoreOptions {
    pub fn new(
        connection: ConnectionSource,
        database: impl Into<String>,
        collection: impl Into<String>,
        from: Vec<u8>,
    ) -> Self {
        Self {
            connection,
            database: database.into(),
            collection: collection.into(),
            from,
            limit: None,
            policy: RestorePolicy::default(),
            filter: None,
            transform: None,
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Document) -> Document + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        require(&self.database, "database")?;
        require(&self.collection, "collection")
    }
}

/// Restore one `.bson` (or `.bson.gz`) file into one collection.
#[derive(Clone)]
pub struct CollectionRestoreOptions {
    pub connection: ConnectionSource,
    pub database: String,
    pub collection: String,
    pub from: PathBuf,
    pub limit: Option<usize>,
    pub policy: RestorePolicy,
    pub filter: Option<DocumentFilter>,
    pub transform: Option<DocumentTransform>,
}

impl CollectionRestoreOptions {
    pub fn new(
        connection: ConnectionSource,
        database: impl Into<String>,
        collection: impl Into<String>,
        from: impl Into<PathBuf>,
    ) -> Self {
        Self {
            connection,
            database: database.into(),
            collection: collection.into(),
            from: from.into(),
            limit: None,
            policy: RestorePolicy::default(),
            filter: None,
            transform: None,
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Document) -> Document + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        require(&self.database, "database")?;
        require(&self.collection, "collection")?;
        require_path(&self.from, "from")
    }
}

/// Restore every collection file found in one database directory.
#[derive(Clone)]
pub struct DatabaseRestoreOptions {
    pub connection: ConnectionSource,
    pub database: String,
    pub from: PathBuf,
    pub policy: RestorePolicy,
    pub filter: Option<DocumentFilter>,
    pub transform: Option<CollectionTransform>,
}

impl DatabaseRestoreOptions {
    pub fn new(
        connection: ConnectionSource,
        database: impl Into<String>,
        from: impl Into<PathBuf>,
    ) -> Self {
        Self {
            connection,
            database: database.into(),
            from: from.into(),
            policy: RestorePolicy::default(),
            filter: None,
            transform: None,
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Document, &CollectionContext) -> Document + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        require(&self.database, "database")?;
        require_path(&self.from, "from")
    }
}

/// Restore every database directory found in a dump root.
#[derive(Clone)]
pub struct DumpRestoreOptions {
    pub connection: ConnectionSource,
    pub from: PathBuf,
    pub policy: RestorePolicy,
    pub filter: Option<DocumentFilter>,
    pub transform: Option<DatabaseTransform>,
}

impl DumpRestoreOptions {
    pub fn new(connection: ConnectionSource, from: impl Into<PathBuf>) -> Self {
        Self {
            connection,
            from: from.into(),
            policy: RestorePolicy::default(),
            filter: None,
            transform: None,
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Document, &DatabaseContext) -> Document + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        require_path(&self.from, "from")
    }
}

/// Restore a dump tree packed as a `.tar.gz` archive.
#[derive(Clone)]
pub struct ArchiveRestoreOptions {
    pub connection: ConnectionSource,
    pub archive: PathBuf,
    /// Directory inside the archive that holds the database folders.
    pub dump_root: Option<PathBuf>,
    pub policy: RestorePolicy,
    pub filter: Option<DocumentFilter>,
    pub transform: Option<DatabaseTransform>,
}

impl ArchiveRestoreOptions {
    pub fn new(connection: ConnectionSource, archive: impl Into<PathBuf>) -> Self {
        Self {
            connection,
            archive: archive.into(),
            dump_root: None,
            policy: RestorePolicy::default(),
            filter: None,
            transform: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        require_path(&self.archive, "archive")?;
        if let Some(root) = &self.dump_root {
            if root.is_absolute() || root.components().any(|c| c == std::path::Component::ParentDir) {
                return Err(RestoreError::Config(format!(
                    "dump_root must be a relative path inside the archive: {}",
                    root.display()
                )));
            }
        }
        Ok(())
    }
}
