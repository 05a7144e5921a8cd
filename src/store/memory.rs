// dumprestore/src/store/memory.rs
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::{Bson, Document};

use super::DocumentStore;
use crate::errors::{RestoreError, Result};

type Collections = BTreeMap<String, Vec<Document>>;

/// In-process [`DocumentStore`] that mimics the server behaviour the restore
/// engine relies on.
///
/// Creating an existing collection fails, and bulk inserts are ordered: the
/// batch stops at the first duplicate `_id`, keeping the documents before it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: Mutex<BTreeMap<String, Collections>>,
    bulk_insert_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding `documents`, bypassing all checks.
    pub fn seed(&self, database: &str, collection: &str, documents: Vec<Document>) {
        let mut databases = self.lock();
        databases
            .entry(database.to_string())
            .or_default()
            .insert(collection.to_string(), documents);
    }

    /// Snapshot of a collection, or `None` if it does not exist.
    pub fn documents(&self, database: &str, collection: &str) -> Option<Vec<Document>> {
        self.lock()
            .get(database)
            .and_then(|collections| collections.get(collection))
            .cloned()
    }

    pub fn collection_names(&self, database: &str) -> Vec<String> {
        self.lock()
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn bulk_insert_calls(&self) -> usize {
        self.bulk_insert_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Collections>> {
        // A poisoned map is still structurally valid; keep serving it.
        self.databases.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_collection_names(&self, database: &str, names: &[String]) -> Result<Vec<String>> {
        let databases = self.lock();
        let Some(collections) = databases.get(database) else {
            return Ok(Vec::new());
        };
        Ok(collections
            .keys()
            .filter(|name| names.contains(name))
            .cloned()
            .collect())
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<()> {
        let mut databases = self.lock();
        let collections = databases.entry(database.to_string()).or_default();
        if collections.contains_key(collection) {
            return Err(RestoreError::Store(format!(
                "Collection {database}.{collection} already exists. NamespaceExists"
            )));
        }
        collections.insert(collection.to_string(), Vec::new());
        Ok(())
    }

    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64> {
        let mut databases = self.lock();
        let deleted = databases
            .get_mut(database)
            .and_then(|collections| collections.get_mut(collection))
            .map(|documents| {
                let count = documents.len() as u64;
                documents.clear();
                count
            })
            .unwrap_or(0);
        Ok(deleted)
    }

    async fn bulk_insert(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64> {
        self.bulk_insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut databases = self.lock();
        // Inserting into a missing collection creates it implicitly, as the server does.
        let existing = databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        let mut inserted = 0u64;
        for document in documents {
            if let Some(id) = document.get("_id") {
                if existing.iter().any(|d| d.get("_id") == Some(id)) {
                    return Err(RestoreError::Store(format!(
                        "E11000 duplicate key error collection: {database}.{collection} dup key: {{ _id: {} }} ({inserted} documents inserted before the failure)",
                        display_id(id)
                    )));
                }
            }
            existing.push(document);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn display_id(id: &Bson) -> String {
    match id {
        Bson::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}
