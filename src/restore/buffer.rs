// dumprestore/src/restore/buffer.rs
use tracing::debug;

use super::decode::{DecodeOptions, decode_all};
use super::guard::try_create_collection;
use super::options::{BufferRestoreOptions, RestorePolicy};
use crate::errors::Result;
use crate::store::DocumentStore;

/// Decodes `buffer` and inserts the accepted documents in a single batch.
///
/// Nothing is inserted when decoding fails or when no document is accepted.
/// Insert failures are returned as-is and never retried.
pub(crate) async fn insert_buffer(
    store: &dyn DocumentStore,
    database: &str,
    collection: &str,
    buffer: &[u8],
    decode: &DecodeOptions<'_>,
) -> Result<u64> {
    let documents = decode_all(buffer, decode)?;
    if documents.is_empty() {
        debug!(database, collection, "no documents accepted, skipping insert");
        return Ok(0);
    }
    store.bulk_insert(database, collection, documents).await
}

/// Creates (or accepts) the collection, then cleans it. Inserts must come after this.
pub(crate) async fn prepare_collection(
    store: &dyn DocumentStore,
    database: &str,
    collection: &str,
    policy: &RestorePolicy,
) -> Result<()> {
    try_create_collection(store, database, collection, &policy.on_collection_exists).await?;
    if policy.clean {
        let deleted = store.delete_all(database, collection).await?;
        debug!(database, collection, deleted, "cleaned collection");
    }
    Ok(())
}

pub(crate) async fn restore_buffer_with(
    store: &dyn DocumentStore,
    options: &BufferRestoreOptions,
) -> Result<u64> {
    prepare_collection(store, &options.database, &options.collection, &options.policy).await?;
    let decode = DecodeOptions {
        limit: options.limit,
        filter: options.filter.as_deref(),
        transform: options.transform.as_deref(),
    };
    insert_buffer(store, &options.database, &options.collection, &options.from, &decode).await
}
