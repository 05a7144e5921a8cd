// dumprestore/src/restore/guard.rs
use tracing::{debug, warn};

use super::options::OnCollectionExists;
use crate::errors::{RestoreError, Result};
use crate::store::DocumentStore;

/// Checks that none of `collections` exist in `database`.
///
/// Returns `true` when none exist and the caller may create them. When some
/// exist, `Throw` fails with the colliding names, `Overwrite` returns `false`,
/// and `Notify` calls the handler for every colliding name before returning `false`.
///
/// The check and the caller's follow-up writes are not atomic with respect to
/// other clients of the same server.
pub async fn check_absent(
    store: &dyn DocumentStore,
    database: &str,
    collections: &[String],
    on_exists: &OnCollectionExists,
) -> Result<bool> {
    let existing = store.list_collection_names(database, collections).await?;

    if existing.is_empty() {
        debug!(database, ?collections, "destination collections are absent");
        return Ok(true);
    }

    match on_exists {
        OnCollectionExists::Throw => Err(RestoreError::CollectionsExist {
            collections: existing,
        }),
        OnCollectionExists::Overwrite => {
            warn!(database, collections = ?existing, "restoring into existing collections");
            Ok(false)
        }
        OnCollectionExists::Notify(handler) => {
            warn!(database, collections = ?existing, "restoring into existing collections");
            for name in &existing {
                handler(name.as_str());
            }
            Ok(false)
        }
    }
}

/// Creates `collection` unless it already exists and the policy allows reuse.
pub async fn try_create_collection(
    store: &dyn DocumentStore,
    database: &str,
    collection: &str,
    on_exists: &OnCollectionExists,
) -> Result<()> {
    let names = [collection.to_string()];
    if check_absent(store, database, &names, on_exists).await? {
        store.create_collection(database, collection).await?;
        debug!(database, collection, "created collection");
    }
    Ok(())
}
