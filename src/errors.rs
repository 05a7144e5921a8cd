use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which level of a fan-out restore produced a set of branch results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchScope {
    /// Branches are collections inside one database.
    Database,
    /// Branches are databases inside one dump.
    Dump,
}

impl fmt::Display for BranchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchScope::Database => f.write_str("collection"),
            BranchScope::Dump => f.write_str("database"),
        }
    }
}

/// One failed branch of a concurrent restore.
#[derive(Debug)]
pub struct BranchFailure {
    pub name: String,
    pub error: Box<RestoreError>,
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "collections [ {} ] already exist; set on_collection_exists to \"overwrite\" to remove this error",
        .collections.join(",")
    )]
    CollectionsExist { collections: Vec<String> },

    #[error("Decode error at byte offset {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    #[error("Database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store operation failed: {0}")]
    Store(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{} of {} {scope} restores failed: [ {} ]",
        .failures.len(),
        branch_total(.failures, .succeeded),
        describe_failures(.failures)
    )]
    Branches {
        scope: BranchScope,
        succeeded: Vec<String>,
        failures: Vec<BranchFailure>,
    },
}

impl RestoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RestoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Names of the colliding collections if this is a `CollectionsExist` error.
    pub fn colliding_collections(&self) -> Option<&[String]> {
        match self {
            RestoreError::CollectionsExist { collections } => Some(collections),
            _ => None,
        }
    }

    /// Every colliding collection name in this error, qualified as
    /// `database.collection` when it comes from a failed dump branch.
    ///
    /// Unlike [`colliding_collections`](Self::colliding_collections) this also
    /// looks inside `Branches` errors.
    pub fn all_colliding_collections(&self) -> Vec<String> {
        match self {
            RestoreError::CollectionsExist { collections } => collections.clone(),
            RestoreError::Branches {
                scope: BranchScope::Dump,
                failures,
                ..
            } => failures
                .iter()
                .flat_map(|f| {
                    f.error
                        .all_colliding_collections()
                        .into_iter()
                        .map(move |name| format!("{}.{}", f.name, name))
                })
                .collect(),
            RestoreError::Branches { failures, .. } => failures
                .iter()
                .flat_map(|f| f.error.all_colliding_collections())
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn branch_total(failures: &[BranchFailure], succeeded: &[String]) -> usize {
    failures.len() + succeeded.len()
}

fn describe_failures(failures: &[BranchFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.name, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, RestoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn exists(names: &[&str]) -> Box<RestoreError> {
        Box::new(RestoreError::CollectionsExist {
            collections: names.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_colliding_names_are_gathered_across_dump_branches() {
        let err = RestoreError::Branches {
            scope: BranchScope::Dump,
            succeeded: vec!["dbC".to_string()],
            failures: vec![
                BranchFailure {
                    name: "dbA".to_string(),
                    error: exists(&["orders", "users"]),
                },
                BranchFailure {
                    name: "dbB".to_string(),
                    error: Box::new(RestoreError::Config("bad".to_string())),
                },
                BranchFailure {
                    name: "dbD".to_string(),
                    error: exists(&["items"]),
                },
            ],
        };

        assert_eq!(err.colliding_collections(), None);
        assert_eq!(
            err.all_colliding_collections(),
            vec!["dbA.orders", "dbA.users", "dbD.items"]
        );
    }

    #[test]
    fn test_database_branches_keep_bare_collection_names() {
        let err = RestoreError::Branches {
            scope: BranchScope::Database,
            succeeded: vec![],
            failures: vec![BranchFailure {
                name: "users".to_string(),
                error: exists(&["users"]),
            }],
        };
        assert_eq!(err.all_colliding_collections(), vec!["users"]);
    }

    #[test]
    fn test_unrelated_errors_have_no_collisions() {
        assert!(RestoreError::Store("E11000".to_string())
            .all_colliding_collections()
            .is_empty());
    }
}
