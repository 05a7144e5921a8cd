pub mod archive;
pub(crate) mod buffer;
pub(crate) mod collection;
pub(crate) mod database;
pub mod decode;
pub(crate) mod dump;
pub mod guard;
pub mod options;

use serde::Serialize;
use tracing::warn;

use crate::errors::{BranchFailure, BranchScope, RestoreError, Result};

pub use options::{
    ArchiveRestoreOptions, BufferRestoreOptions, CollectionContext, CollectionRestoreOptions,
    DatabaseContext, DatabaseRestoreOptions, DumpRestoreOptions, OnCollectionExists,
    RestorePolicy,
};

/// Per-branch outcome of a database or dump restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchReport {
    /// Collection name for a database restore, database name for a dump restore.
    pub name: String,
    pub inserted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub inserted: u64,
    pub branches: Vec<BranchReport>,
}

/// Joins branch outcomes into a summary, or a `Branches` error naming every
/// failed and every successful branch.
pub(crate) fn collect_branches(
    scope: BranchScope,
    outcomes: Vec<(String, Result<u64>)>,
) -> Result<RestoreSummary> {
    let mut summary = RestoreSummary::default();
    let mut failures = Vec::new();

    for (name, outcome) in outcomes {
        match outcome {
            Ok(inserted) => {
                summary.inserted += inserted;
                summary.branches.push(BranchReport { name, inserted });
            }
            Err(error) => {
                warn!(%scope, branch = %name, %error, "restore branch failed");
                failures.push(BranchFailure {
                    name,
                    error: Box::new(error),
                });
            }
        }
    }

    if failures.is_empty() {
        return Ok(summary);
    }
    Err(RestoreError::Branches {
        scope,
        succeeded: summary.branches.into_iter().map(|b| b.name).collect(),
        failures,
    })
}

/// Restores a buffer of concatenated BSON documents into one collection.
///
/// Returns the number of inserted documents.
pub async fn restore_buffer(options: BufferRestoreOptions) -> Result<u64> {
    options.validate()?;
    let connection = options.connection.open().await?;
    let result = buffer::restore_buffer_with(connection.store(), &options).await;
    connection.release(result).await
}

/// Restores one collection dump file.
pub async fn restore_collection(options: CollectionRestoreOptions) -> Result<u64> {
    options.validate()?;
    let connection = options.connection.open().await?;
    let result = collection::restore_collection_from_options(connection.store(), &options).await;
    connection.release(result).await
}

/// Restores every collection file of one database directory.
pub async fn restore_database(options: DatabaseRestoreOptions) -> Result<RestoreSummary> {
    options.validate()?;
    let connection = options.connection.open().await?;
    let result = database::restore_database_from_options(connection.store(), &options).await;
    connection.release(result).await
}

/// Restores every database directory of a dump, sharing one connection.
pub async fn restore_dump(options: DumpRestoreOptions) -> Result<RestoreSummary> {
    options.validate()?;
    let connection = options.connection.open().await?;
    let result = dump::restore_dump_from_options(connection.store(), &options).await;
    connection.release(result).await
}

/// Restores a dump packed as a `.tar.gz` archive.
pub async fn restore_dump_archive(options: ArchiveRestoreOptions) -> Result<RestoreSummary> {
    options.validate()?;
    let connection = options.connection.open().await?;
    let result = archive::restore_archive_with(connection.store(), &options).await;
    connection.release(result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_branches_sums_successes() {
        let summary = collect_branches(
            BranchScope::Database,
            vec![("users".to_string(), Ok(3)), ("orders".to_string(), Ok(4))],
        )
        .unwrap();
        assert_eq!(summary.inserted, 7);
        assert_eq!(summary.branches.len(), 2);
    }

    #[test]
    fn test_collect_branches_reports_every_branch_on_failure() {
        let err = collect_branches(
            BranchScope::Dump,
            vec![
                ("dbA".to_string(), Ok(3)),
                ("dbB".to_string(), Err(RestoreError::Config("boom".to_string()))),
            ],
        )
        .unwrap_err();

        match err {
            RestoreError::Branches {
                scope,
                succeeded,
                failures,
            } => {
                assert_eq!(scope, BranchScope::Dump);
                assert_eq!(succeeded, vec!["dbA".to_string()]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].name, "dbB");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
