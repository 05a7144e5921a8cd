//! Restores `mongodump`-style BSON dumps into a live document database.
//!
//! A dump is laid out as `<dump root>/<database>/<collection>.bson`, each file
//! holding back-to-back BSON documents. Restores can run at four levels (a raw
//! buffer, one collection file, one database folder, or a whole dump) and share
//! the same policy: an existence guard that refuses to clobber collections
//! unless asked to, an optional clean step, and per-document filter/transform
//! hooks applied while decoding.

pub mod config;
pub mod errors;
pub mod restore;
pub mod store;
pub mod utils;

pub use errors::{BranchFailure, BranchScope, RestoreError, Result};
pub use restore::{
    ArchiveRestoreOptions, BranchReport, BufferRestoreOptions, CollectionContext,
    CollectionRestoreOptions, DatabaseContext, DatabaseRestoreOptions, DumpRestoreOptions,
    OnCollectionExists, RestorePolicy, RestoreSummary, restore_buffer, restore_collection,
    restore_database, restore_dump, restore_dump_archive,
};
pub use store::{ConnectionSource, DocumentStore, MemoryStore, MongoStore};
