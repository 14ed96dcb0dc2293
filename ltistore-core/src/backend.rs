//! Storage backend abstraction for the adapter.
//!
//! The CRUD facade never talks to a database directly. It drives a [`StoreBackend`], which
//! executes equality queries, single-document writes, atomic batch deletes, and read-then-write
//! transactions against one physical collection at a time.
//!
//! # Traits
//!
//! - [`StoreBackend`]: the core trait for storage backends
//! - [`StoreTransaction`]: a snapshot-isolated read-then-write unit of work
//! - [`StoreBackendBuilder`]: factory trait for creating backend instances
//!
//! Both `&B` and `Box<B>` implement [`StoreBackend`] whenever `B` does, so a facade can borrow a
//! backend, own it, or hold a `Box<dyn StoreBackend>` chosen at runtime.

use async_trait::async_trait;
use bson::{Document, Uuid};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::Query};

/// A persisted document together with its store-generated identifier.
///
/// `data` never contains the identifier itself.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub data: Document,
}

impl StoredDocument {
    pub fn new(id: Uuid, data: Document) -> Self {
        Self { id, data }
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. A single backend value is expected to be shared by the whole process.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult). Backends
/// report aborted transactions as [`DocumentStoreError::Conflict`](crate::error::DocumentStoreError::Conflict)
/// and everything else they cannot classify as `Backend`.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Prepares the backend for use. Called once by the host at startup.
    async fn setup(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    /// Releases backend resources. The default implementation is a no-op.
    async fn close(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    /// Returns every document of `collection` matched by `query`, in no particular order.
    ///
    /// A collection that does not exist yields an empty result.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>>;

    /// Stores a new document under a freshly generated identifier and returns that identifier.
    ///
    /// The collection is created on first write.
    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Uuid>;

    /// Sets each field of `fields` on the document `id`, leaving its other fields untouched.
    ///
    /// Fails with `DocumentNotFound` if no such document exists.
    async fn update_document(
        &self,
        id: Uuid,
        fields: Document,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes all listed documents as one atomic batch. Unknown ids are skipped.
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;

    /// Starts a read-then-write transaction.
    async fn begin_transaction<'a>(&'a self) -> DocumentStoreResult<Box<dyn StoreTransaction + 'a>>;
}

/// A unit of work whose reads observe one snapshot and whose writes apply atomically on commit.
///
/// All reads must happen before the first write. Dropping a transaction without calling
/// [`commit`](StoreTransaction::commit) discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Runs `query` against `collection` inside the transaction.
    async fn query_documents(
        &mut self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>>;

    /// Overwrites document `id` with `document`, or creates a new document when `id` is `None`.
    /// Returns the identifier of the written document.
    async fn set_document(
        &mut self,
        id: Option<Uuid>,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Uuid>;

    /// Applies all writes atomically. Fails with `Conflict` if a concurrent write invalidated
    /// anything this transaction read.
    async fn commit(self: Box<Self>) -> DocumentStoreResult<()>;

    /// Abandons the transaction.
    async fn rollback(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend + ?Sized,
{
    async fn setup(&self) -> DocumentStoreResult<()> {
        (**self).setup().await
    }

    async fn close(&self) -> DocumentStoreResult<()> {
        (**self).close().await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>> {
        (**self)
            .query_documents(query, collection)
            .await
    }

    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Uuid> {
        (**self)
            .insert_document(document, collection)
            .await
    }

    async fn update_document(
        &self,
        id: Uuid,
        fields: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (**self)
            .update_document(id, fields, collection)
            .await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        (**self)
            .delete_documents(ids, collection)
            .await
    }

    async fn begin_transaction<'a>(&'a self) -> DocumentStoreResult<Box<dyn StoreTransaction + 'a>> {
        (**self).begin_transaction().await
    }
}

#[async_trait]
impl<B> StoreBackend for Box<B>
where
    B: StoreBackend + ?Sized,
{
    async fn setup(&self) -> DocumentStoreResult<()> {
        (**self).setup().await
    }

    async fn close(&self) -> DocumentStoreResult<()> {
        (**self).close().await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>> {
        (**self)
            .query_documents(query, collection)
            .await
    }

    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Uuid> {
        (**self)
            .insert_document(document, collection)
            .await
    }

    async fn update_document(
        &self,
        id: Uuid,
        fields: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (**self)
            .update_document(id, fields, collection)
            .await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        (**self)
            .delete_documents(ids, collection)
            .await
    }

    async fn begin_transaction<'a>(&'a self) -> DocumentStoreResult<Box<dyn StoreTransaction + 'a>> {
        (**self).begin_transaction().await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
