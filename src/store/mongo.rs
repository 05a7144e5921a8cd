// dumprestore/src/store/mongo.rs
use async_trait::async_trait;
use bson::{Document, doc};
use mongodb::options::{DatabaseOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Database};
use tracing::debug;

use super::DocumentStore;
use crate::errors::Result;

/// [`DocumentStore`] backed by the official MongoDB driver.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        debug!("MongoDB client created");
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Existence checks must not be answered by a lagging secondary.
    fn primary_database(&self, database: &str) -> Database {
        let options = DatabaseOptions::builder()
            .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
            .build();
        self.client.database_with_options(database, options)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_collection_names(&self, database: &str, names: &[String]) -> Result<Vec<String>> {
        let filter = doc! { "name": { "$in": names.to_vec() } };
        let existing = self
            .primary_database(database)
            .list_collection_names(Some(filter))
            .await?;
        Ok(existing)
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<()> {
        self.client
            .database(database)
            .create_collection(collection, None)
            .await?;
        Ok(())
    }

    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64> {
        let result = self
            .client
            .database(database)
            .collection::<Document>(collection)
            .delete_many(doc! {}, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn bulk_insert(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64> {
        let result = self
            .client
            .database(database)
            .collection::<Document>(collection)
            .insert_many(documents, None)
            .await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
