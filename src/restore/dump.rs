// dumprestore/src/restore/dump.rs
use std::path::Path;

use bson::Document;
use futures::future::join_all;
use tracing::info;

use super::database::restore_database_with;
use super::options::{CollectionContext, DatabaseContext, DumpRestoreOptions, RestorePolicy};
use super::{RestoreSummary, collect_branches};
use crate::errors::{BranchScope, Result};
use crate::store::DocumentStore;
use crate::utils::dump_files::database_dirs;

/// Restores every database directory under `from`, concurrently, sharing `store`.
///
/// Each directory name is used as the destination database name.
pub(crate) async fn restore_dump_with(
    store: &dyn DocumentStore,
    from: &Path,
    policy: &RestorePolicy,
    filter: Option<&(dyn Fn(&Document) -> bool + Send + Sync)>,
    transform: Option<&(dyn Fn(Document, &DatabaseContext) -> Document + Send + Sync)>,
) -> Result<RestoreSummary> {
    let databases = database_dirs(from)?;

    let restores = databases.iter().map(|entry| async move {
        let context = DatabaseContext {
            database: entry.name.clone(),
        };
        let with_context = transform.map(|transform| {
            move |document: Document, _: &CollectionContext| transform(document, &context)
        });
        let result = restore_database_with(
            store,
            &entry.name,
            &entry.path,
            policy,
            filter,
            with_context
                .as_ref()
                .map(|f| f as &(dyn Fn(Document, &CollectionContext) -> Document + Send + Sync)),
        )
        .await
        .map(|summary| summary.inserted);
        (entry.name.clone(), result)
    });

    let outcomes = join_all(restores).await;
    let summary = collect_branches(BranchScope::Dump, outcomes)?;
    info!(
        databases = summary.branches.len(),
        inserted = summary.inserted,
        "restored dump from {}",
        from.display()
    );
    Ok(summary)
}

pub(crate) async fn restore_dump_from_options(
    store: &dyn DocumentStore,
    options: &DumpRestoreOptions,
) -> Result<RestoreSummary> {
    restore_dump_with(
        store,
        &options.from,
        &options.policy,
        options.filter.as_deref(),
        options.transform.as_deref(),
    )
    .await
}
