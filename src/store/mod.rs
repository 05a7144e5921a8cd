//! Destination store abstraction.
//!
//! The restore engine only ever talks to a [`DocumentStore`]; the MongoDB driver
//! binding lives in [`mongo`] and an in-process implementation in [`memory`].

pub mod memory;
pub mod mongo;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use tracing::warn;

use crate::errors::{RestoreError, Result};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A live session against a document database server.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the subset of `names` that currently exist in `database`.
    async fn list_collection_names(&self, database: &str, names: &[String]) -> Result<Vec<String>>;

    async fn create_collection(&self, database: &str, collection: &str) -> Result<()>;

    /// Removes every document from the collection and returns how many were deleted.
    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64>;

    /// Inserts all documents in one ordered batch and returns how many were inserted.
    async fn bulk_insert(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64>;

    async fn close(&self) -> Result<()>;
}

/// Where a restore call gets its connection from.
///
/// A `Handle` stays owned by the caller and is never closed here. A `Uri` is
/// connected at the start of the call and closed when the call finishes.
#[derive(Clone)]
pub enum ConnectionSource {
    Uri(String),
    Handle(Arc<dyn DocumentStore>),
}

impl fmt::Debug for ConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionSource::Uri(_) => f.write_str("ConnectionSource::Uri(..)"),
            ConnectionSource::Handle(_) => f.write_str("ConnectionSource::Handle(..)"),
        }
    }
}

impl From<Arc<dyn DocumentStore>> for ConnectionSource {
    fn from(handle: Arc<dyn DocumentStore>) -> Self {
        ConnectionSource::Handle(handle)
    }
}

impl ConnectionSource {
    pub fn uri(uri: impl Into<String>) -> Self {
        ConnectionSource::Uri(uri.into())
    }

    pub fn handle<S: DocumentStore + 'static>(store: Arc<S>) -> Self {
        ConnectionSource::Handle(store)
    }

    /// Checks the source without touching the network.
    pub fn validate(&self) -> Result<()> {
        match self {
            ConnectionSource::Uri(uri) if uri.trim().is_empty() => Err(RestoreError::Config(
                "neither a connection handle nor a URI was given".to_string(),
            )),
            // Never echo the URI back: it may carry credentials.
            ConnectionSource::Uri(uri) if !has_mongodb_scheme(uri) => Err(RestoreError::Config(
                format!("connection URI must start with one of {}", MONGODB_SCHEMES.join(", ")),
            )),
            ConnectionSource::Uri(_) => Ok(()),
            ConnectionSource::Handle(_) => Ok(()),
        }
    }

    pub(crate) async fn open(&self) -> Result<Connection> {
        match self {
            ConnectionSource::Uri(uri) => {
                let store = MongoStore::connect(uri).await?;
                Ok(Connection {
                    store: Arc::new(store),
                    owned: true,
                })
            }
            ConnectionSource::Handle(store) => Ok(Connection {
                store: Arc::clone(store),
                owned: false,
            }),
        }
    }
}

/// Multi-host seed lists are not valid URLs, so only the scheme is checked here;
/// the driver parses the rest when connecting.
const MONGODB_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

fn has_mongodb_scheme(uri: &str) -> bool {
    let uri = uri.trim_start();
    MONGODB_SCHEMES.iter().any(|scheme| uri.starts_with(scheme))
}

/// A resolved connection for the duration of one top-level restore call.
pub(crate) struct Connection {
    store: Arc<dyn DocumentStore>,
    owned: bool,
}

impl Connection {
    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Closes an owned connection and combines the outcome with the restore result.
    ///
    /// An error from the restore itself wins over a teardown error.
    pub(crate) async fn release<T>(self, result: Result<T>) -> Result<T> {
        if !self.owned {
            return result;
        }
        let closed = self.store.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "failed to close connection after a failed restore");
                Err(err)
            }
        }
    }
}
