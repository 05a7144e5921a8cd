// dumprestore/src/restore/database.rs
use std::path::Path;

use bson::Document;
use futures::future::join_all;
use tracing::info;

use super::collection::restore_collection_with;
use super::decode::DecodeOptions;
use super::guard::check_absent;
use super::options::{CollectionContext, DatabaseRestoreOptions, RestorePolicy};
use super::{RestoreSummary, collect_branches};
use crate::errors::{BranchScope, Result};
use crate::store::DocumentStore;
use crate::utils::dump_files::collection_files;

type ContextTransform<'f> = &'f (dyn Fn(Document, &CollectionContext) -> Document + Send + Sync);

/// Restores every collection file in `from` into `database` over an existing connection.
///
/// All collection names are checked in one batch first, so under `Throw` a
/// single collision aborts before anything is created. Collections are then
/// restored concurrently and every launched restore runs to completion.
pub(crate) async fn restore_database_with(
    store: &dyn DocumentStore,
    database: &str,
    from: &Path,
    policy: &RestorePolicy,
    filter: Option<&(dyn Fn(&Document) -> bool + Send + Sync)>,
    transform: Option<ContextTransform<'_>>,
) -> Result<RestoreSummary> {
    let files = collection_files(from)?;
    let names: Vec<String> = files.iter().map(|f| f.collection.clone()).collect();

    if !names.is_empty() {
        check_absent(store, database, &names, &policy.on_collection_exists).await?;
    }

    // Collisions were already reported by the batch check.
    let branch_policy = RestorePolicy {
        clean: policy.clean,
        on_collection_exists: policy.on_collection_exists.after_batch_check(),
    };

    let restores = files.iter().map(|file| {
        let branch_policy = &branch_policy;
        async move {
            let context = CollectionContext {
                collection: file.collection.clone(),
            };
            let with_context = transform.map(|transform| {
                move |document: Document| transform(document, &context)
            });
            let decode = DecodeOptions {
                limit: None,
                filter,
                transform: with_context
                    .as_ref()
                    .map(|f| f as &(dyn Fn(Document) -> Document + Send + Sync)),
            };
            let result = restore_collection_with(
                store,
                database,
                &file.collection,
                &file.path,
                branch_policy,
                &decode,
            )
            .await;
            (file.collection.clone(), result)
        }
    });

    let outcomes = join_all(restores).await;
    let summary = collect_branches(BranchScope::Database, outcomes)?;
    info!(
        database,
        collections = summary.branches.len(),
        inserted = summary.inserted,
        "restored database from {}",
        from.display()
    );
    Ok(summary)
}

pub(crate) async fn restore_database_from_options(
    store: &dyn DocumentStore,
    options: &DatabaseRestoreOptions,
) -> Result<RestoreSummary> {
    restore_database_with(
        store,
        &options.database,
        &options.from,
        &options.policy,
        options.filter.as_deref(),
        options.transform.as_deref(),
    )
    .await
}
