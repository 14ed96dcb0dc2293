//! The CRUD facade hosts use to persist records.
//!
//! [`DocumentStore`] translates five host operations into backend calls:
//!
//! | Operation | Behavior |
//! |---|---|
//! | [`get`](DocumentStore::get) | Query, drop expired documents, decrypt when a secret is given |
//! | [`insert`](DocumentStore::insert) | Stamp and create a new document, no uniqueness check |
//! | [`replace`](DocumentStore::replace) | Transactional upsert of the single document matching a query |
//! | [`modify`](DocumentStore::modify) | Partial update of the single document matching a query |
//! | [`delete`](DocumentStore::delete) | Atomic batch delete of every matching document |
//!
//! `replace` and `modify` refuse to act when more than one document matches. `replace` reads
//! and writes inside one backend transaction. `modify` reads and then writes with two separate
//! calls, so a concurrent writer between the two can be overwritten.
//!
//! # Example
//!
//! ```ignore
//! use ltistore::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//!
//! store.insert(Some("LTIKEY"), "widgets", &doc! { "foo": "bar-1" }, Some(&doc! { "id": "id-1" })).await?;
//!
//! let found = store.get(Some("LTIKEY"), "widgets", &Criteria::new().eq("id", "id-1")).await?;
//! ```

use bson::{Bson, Document, Uuid};
use tracing::{debug, info, warn};

use crate::{
    backend::StoreBackend,
    codec,
    collection::{Collection, CollectionResolver},
    document::DocumentBody,
    error::{DocumentStoreError, DocumentStoreResult},
    expiry::{CREATED_AT, ExpiryPolicy},
    options::StoreOptions,
    query::{Criteria, Query},
};

/// Treats an empty secret the same as no secret.
fn active_secret(secret: Option<&str>) -> Option<&str> {
    secret.filter(|secret| !secret.is_empty())
}

/// The adapter facade bound to a specific backend implementation.
///
/// The backend is injected at construction and shared by every call; the store itself holds
/// nothing but immutable configuration.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    resolver: CollectionResolver,
    expiry: ExpiryPolicy,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a store with default options: no prefix and the built-in TTL table.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(backend: B, options: StoreOptions) -> Self {
        Self {
            backend,
            resolver: options.resolver(),
            expiry: options.expiry_policy(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a handle on the collection stored under the resolved path of `name`.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(self.resolver.resolve(name), &self.backend)
    }

    /// Prepares the backend. Hosts call this once at startup.
    pub async fn setup(&self) -> DocumentStoreResult<()> {
        info!(prefix = self.resolver.prefix(), "document store setup");

        self.backend.setup().await
    }

    /// Releases the backend.
    pub async fn close(&self) -> DocumentStoreResult<()> {
        info!("document store close");

        self.backend.close().await
    }

    /// Returns the live documents of `collection` matching `criteria`, or `None` if there are
    /// none.
    ///
    /// Without a secret, stored documents are returned as they are. With a secret, each result
    /// is the decrypted payload plus `createdAt` as milliseconds since the epoch; index fields
    /// and timestamps other than `createdAt` are not part of the result.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::MissingCollection`] if `collection` is empty.
    pub async fn get(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
    ) -> DocumentStoreResult<Option<Vec<Document>>> {
        if collection.is_empty() {
            return Err(DocumentStoreError::MissingCollection);
        }

        let collection = self.collection(collection);
        debug!(collection = collection.path(), query = %criteria, "get");

        let live = collection
            .find(criteria)
            .await?
            .into_iter()
            .map(|stored| stored.data)
            .filter(|data| !ExpiryPolicy::is_expired(data))
            .collect::<Vec<_>>();

        let documents = match active_secret(secret) {
            None => live,
            Some(secret) => live
                .iter()
                .map(|stored| Self::reveal(stored, secret))
                .collect::<DocumentStoreResult<Vec<_>>>()?,
        };

        Ok((!documents.is_empty()).then_some(documents))
    }

    /// Creates a new document in `collection`.
    ///
    /// With a secret, `payload` is encrypted and stored next to `index`, which is then required.
    /// Without one, `payload` is stored as is and `index` is ignored.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::MissingParams`] if `collection` is empty, or a secret is given
    /// without `index`.
    pub async fn insert(
        &self,
        secret: Option<&str>,
        collection: &str,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<()> {
        let document = self.prepare(secret, collection, payload, index)?;
        let collection = self.collection(collection);
        debug!(collection = collection.path(), "insert");

        collection.insert(document).await?;

        Ok(())
    }

    /// Replaces the single document matching `criteria` with a freshly stamped body, creating it
    /// if nothing matches.
    ///
    /// The stamp is always renewed, so an expired document that was not yet deleted becomes
    /// readable again.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::MissingParams`] as for [`insert`](Self::insert)
    /// - [`DocumentStoreError::MultipleDocumentsFound`] if more than one document matches
    /// - [`DocumentStoreError::Transaction`] for any other failure of the transaction,
    ///   including conflicts with concurrent writers; the caller decides whether to retry
    pub async fn replace(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<()> {
        let document = self.prepare(secret, collection, payload, index)?;
        let path = self.resolver.resolve(collection);
        debug!(collection = %path, query = %criteria, "replace");

        self.replace_in_transaction(&path, criteria, document)
            .await
            .map_err(DocumentStoreError::into_transaction_error)
    }

    async fn replace_in_transaction(
        &self,
        path: &str,
        criteria: &Criteria,
        document: Document,
    ) -> DocumentStoreResult<()> {
        let mut transaction = self.backend.begin_transaction().await?;
        let matches = transaction
            .query_documents(Query::matching(criteria), path)
            .await?;

        let target = match matches.as_slice() {
            [] => None,
            [existing] => Some(existing.id),
            _ => {
                warn!(
                    collection = path,
                    query = %criteria,
                    found = matches.len(),
                    "replace matched multiple documents"
                );

                if let Err(err) = transaction.rollback().await {
                    warn!(collection = path, error = %err, "rollback failed");
                }

                return Err(DocumentStoreError::MultipleDocumentsFound(
                    path.to_string(),
                    criteria.to_string(),
                ));
            }
        };

        transaction
            .set_document(target, document, path)
            .await?;
        transaction.commit().await
    }

    /// Updates fields of the single document matching `criteria`.
    ///
    /// Without a secret every field of `patch` is set on the stored document. With a secret the
    /// stored payload is decrypted, only the first field of `patch` is applied to it, and the
    /// re-encrypted payload replaces `iv`/`data`; index fields are left alone.
    ///
    /// The lookup and the update are separate backend calls and are not isolated from
    /// concurrent writers. Expiry is not considered when matching.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::MissingParams`] if `collection` or `patch` is empty
    /// - [`DocumentStoreError::DocumentNotFound`] if nothing matches
    /// - [`DocumentStoreError::MultipleDocumentsFound`] if more than one document matches
    pub async fn modify(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
        patch: &Document,
    ) -> DocumentStoreResult<()> {
        if collection.is_empty() || patch.is_empty() {
            return Err(DocumentStoreError::MissingParams);
        }

        let collection = self.collection(collection);
        debug!(collection = collection.path(), query = %criteria, "modify");

        let mut matches = collection.find(criteria).await?;
        let target = match matches.len() {
            0 => {
                return Err(DocumentStoreError::DocumentNotFound(
                    criteria.to_string(),
                    collection.path().to_string(),
                ));
            }
            1 => matches.remove(0),
            found => {
                warn!(
                    collection = collection.path(),
                    query = %criteria,
                    found,
                    "modify matched multiple documents"
                );

                return Err(DocumentStoreError::MultipleDocumentsFound(
                    collection.path().to_string(),
                    criteria.to_string(),
                ));
            }
        };

        let fields = match active_secret(secret) {
            None => patch.clone(),
            Some(secret) => {
                let mut payload = codec::open(&target.data, secret)?;
                if let Some((field, value)) = patch.iter().next() {
                    payload.insert(field.clone(), value.clone());
                }

                codec::seal(&payload, secret)?.to_document()
            }
        };

        collection.update(target.id, fields).await
    }

    /// Deletes every document of `collection` matching `criteria` in one atomic batch.
    ///
    /// Matching nothing is not an error. Empty criteria delete the whole collection.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::MissingParams`] if `collection` is empty.
    pub async fn delete(&self, collection: &str, criteria: &Criteria) -> DocumentStoreResult<()> {
        if collection.is_empty() {
            return Err(DocumentStoreError::MissingParams);
        }

        let collection = self.collection(collection);
        if criteria.is_empty() {
            warn!(collection = collection.path(), "delete without criteria removes every document");
        } else {
            debug!(collection = collection.path(), query = %criteria, "delete");
        }

        let ids = collection
            .find(criteria)
            .await?
            .into_iter()
            .map(|stored| stored.id)
            .collect::<Vec<Uuid>>();

        collection.delete(ids).await
    }

    /// Validates write arguments and builds the stamped document for `collection`.
    fn prepare(
        &self,
        secret: Option<&str>,
        collection: &str,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<Document> {
        if collection.is_empty() {
            return Err(DocumentStoreError::MissingParams);
        }

        Ok(DocumentBody::new(active_secret(secret), payload, index)?
            .into_document(self.expiry.stamp(collection)))
    }

    /// Decrypts a stored document into the payload handed back by [`get`](Self::get).
    fn reveal(stored: &Document, secret: &str) -> DocumentStoreResult<Document> {
        let mut payload = codec::open(stored, secret)?;

        if let Some(Bson::DateTime(created_at)) = stored.get(CREATED_AT) {
            payload.insert(CREATED_AT, created_at.timestamp_millis());
        }

        Ok(payload)
    }
}
