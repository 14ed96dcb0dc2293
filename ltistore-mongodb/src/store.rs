use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Uuid, de::deserialize_from_bson, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, TRANSIENT_TRANSACTION_ERROR},
    options::ClientOptions,
};
use tracing::{debug, info, warn};

use ltistore_core::{
    backend::{StoreBackend, StoreBackendBuilder, StoreTransaction, StoredDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};

use crate::{sanitizer::KeySanitizer, query::MongoQueryTranslator, transaction::MongoDbTransaction};

/// Environment variable holding the connection string read by [`MongoDbStoreBuilder::from_env`].
pub const URI_ENV: &str = "LTISTORE_MONGODB_URI";
/// Environment variable holding the database name read by [`MongoDbStoreBuilder::from_env`].
pub const DATABASE_ENV: &str = "LTISTORE_MONGODB_DATABASE";

const ID_FIELD: &str = "_id";


/// Maps a driver error, reporting aborted transactions as conflicts.
pub(crate) fn map_error(err: MongoError) -> DocumentStoreError {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        DocumentStoreError::Conflict(err.to_string())
    } else {
        DocumentStoreError::Backend(err.to_string())
    }
}

/// Builds the stored form of `document` under identifier `id`.
pub(crate) fn prepare_document(id: Uuid, document: Document) -> Document {
    let mut prepared = doc! { ID_FIELD: id };
    for (field, value) in KeySanitizer::escape_document(document) {
        prepared.insert(field, value);
    }
    prepared
}

/// Splits a stored document back into its identifier and the caller-visible fields.
pub(crate) fn restore_document(mut document: Document) -> DocumentStoreResult<StoredDocument> {
    let id = document
        .remove(ID_FIELD)
        .ok_or_else(|| DocumentStoreError::InvalidDocument("stored document has no _id".into()))?;

    Ok(StoredDocument::new(
        deserialize_from_bson::<Uuid>(id)?,
        KeySanitizer::restore_document(document),
    ))
}


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::escape_key(collection_name))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn setup(&self) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        info!(database = %self.database, "connected to mongodb");
        Ok(())
    }

    async fn close(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        info!(database = %self.database, "mongodb client shut down");
        Ok(())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.get_collection(collection)
            .find(MongoQueryTranslator::translate(&query)?)
            .await
            .map_err(map_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(map_error)?
            .into_iter()
            .map(restore_document)
            .collect()
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<Uuid> {
        let id = Uuid::new();

        self.get_collection(collection)
            .insert_one(prepare_document(id, document))
            .await
            .map_err(map_error)?;

        Ok(id)
    }

    async fn update_document(&self, id: Uuid, fields: Document, collection: &str) -> DocumentStoreResult<()> {
        let result = self.get_collection(collection)
            .update_one(
                doc! { ID_FIELD: id },
                doc! { "$set": KeySanitizer::escape_document(fields) },
            )
            .await
            .map_err(map_error)?;

        if result.matched_count == 0 {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut session = self.client.start_session().await.map_err(map_error)?;
        session.start_transaction().await.map_err(map_error)?;

        let result = self.get_collection(collection)
            .delete_many(doc! { ID_FIELD: { "$in": ids } })
            .session(&mut session)
            .await;

        match result {
            Ok(deleted) => {
                session.commit_transaction().await.map_err(map_error)?;
                debug!(collection, deleted = deleted.deleted_count, "deleted documents");

                Ok(())
            }
            Err(err) => {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(collection, error = %abort, "failed to abort delete transaction");
                }

                Err(map_error(err))
            }
        }
    }

    async fn begin_transaction<'a>(&'a self) -> DocumentStoreResult<Box<dyn StoreTransaction + 'a>> {
        Ok(Box::new(MongoDbTransaction::start(self).await?))
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }

    /// Reads the connection string and database name from [`URI_ENV`] and [`DATABASE_ENV`].
    pub fn from_env() -> DocumentStoreResult<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| DocumentStoreError::Initialization(format!("{name} is not set")))
        };

        Ok(Self::new(&read(URI_ENV)?, &read(DATABASE_ENV)?))
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
