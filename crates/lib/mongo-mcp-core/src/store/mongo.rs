use std::time::Duration;

use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};

use super::{DocumentStore, FindSpec, StoreResult};

/// MongoDB-backed collection reader.
#[derive(Clone)]
pub struct MongoCollection {
    client: Client,
    database: String,
    collection: Collection<Document>,
}

impl MongoCollection {
    /// Parses `uri`, applies the server selection timeout and binds the collection.
    ///
    /// The driver connects lazily; call [`DocumentStore::ping`] to confirm the
    /// server is reachable.
    ///
    /// # Errors
    /// Returns `StoreError` if the URI cannot be parsed or the client cannot be built.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        selection_timeout: Duration,
    ) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.server_selection_timeout = Some(selection_timeout);
        options.connect_timeout = Some(selection_timeout);
        let client = Client::with_options(options)?;
        Ok(Self::from_client(client, database, collection))
    }

    #[must_use]
    pub fn from_client(client: Client, database: &str, collection: &str) -> Self {
        let collection = client.database(database).collection::<Document>(collection);
        Self {
            client,
            database: database.to_string(),
            collection,
        }
    }
}

impl DocumentStore for MongoCollection {
    const BACKEND: &'static str = "MongoDB";

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn count(&self, filter: Document) -> StoreResult<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }

    async fn find(&self, filter: Document, spec: FindSpec) -> StoreResult<Vec<Document>> {
        let mut find = self.collection.find(filter);
        if let Some(projection) = spec.projection {
            find = find.projection(projection);
        }
        if let Some(sort) = spec.sort {
            find = find.sort(sort);
        }
        if spec.skip > 0 {
            find = find.skip(spec.skip);
        }
        let cursor = find.limit(spec.limit).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}
