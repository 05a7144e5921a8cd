// dumprestore/src/restore/collection.rs
use std::path::Path;

use tracing::info;

use super::buffer::{insert_buffer, prepare_collection};
use super::decode::DecodeOptions;
use super::options::{CollectionRestoreOptions, RestorePolicy};
use crate::errors::Result;
use crate::store::DocumentStore;
use crate::utils::dump_files::read_dump_file;

/// Restores one dump file into `database.collection` over an existing connection.
///
/// Guard and clean run before the file is read; the file is then loaded whole
/// and inserted in one batch.
pub(crate) async fn restore_collection_with(
    store: &dyn DocumentStore,
    database: &str,
    collection: &str,
    from: &Path,
    policy: &RestorePolicy,
    decode: &DecodeOptions<'_>,
) -> Result<u64> {
    prepare_collection(store, database, collection, policy).await?;

    let buffer = read_dump_file(from).await?;
    let inserted = insert_buffer(store, database, collection, &buffer, decode).await?;

    info!(
        database,
        collection,
        inserted,
        bytes = buffer.len(),
        "restored collection from {}",
        from.display()
    );
    Ok(inserted)
}

pub(crate) async fn restore_collection_from_options(
    store: &dyn DocumentStore,
    options: &CollectionRestoreOptions,
) -> Result<u64> {
    let decode = DecodeOptions {
        limit: options.limit,
        filter: options.filter.as_deref(),
        transform: options.transform.as_deref(),
    };
    restore_collection_with(
        store,
        &options.database,
        &options.collection,
        &options.from,
        &options.policy,
        &decode,
    )
    .await
}
