//! The plug-in interface an LTI host programs against.
//!
//! Hosts keep a `Box<dyn Database>` and stay unaware of the backend behind it. Every
//! [`DocumentStore`] implements the trait.

use async_trait::async_trait;
use bson::Document;

use crate::{
    backend::StoreBackend,
    error::DocumentStoreResult,
    query::Criteria,
    store::DocumentStore,
};

/// Object-safe persistence interface consumed by the host.
///
/// `secret` is the host's encryption key, or `None` (or an empty string) when records are
/// stored unencrypted. See [`DocumentStore`] for the semantics of each operation.
#[async_trait]
pub trait Database: Send + Sync {
    async fn setup(&self) -> DocumentStoreResult<()>;

    async fn close(&self) -> DocumentStoreResult<()>;

    async fn get(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
    ) -> DocumentStoreResult<Option<Vec<Document>>>;

    async fn insert(
        &self,
        secret: Option<&str>,
        collection: &str,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<()>;

    async fn replace(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<()>;

    async fn modify(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
        patch: &Document,
    ) -> DocumentStoreResult<()>;

    async fn delete(&self, collection: &str, criteria: &Criteria) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend> Database for DocumentStore<B> {
    async fn setup(&self) -> DocumentStoreResult<()> {
        DocumentStore::setup(self).await
    }

    async fn close(&self) -> DocumentStoreResult<()> {
        DocumentStore::close(self).await
    }

    async fn get(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
    ) -> DocumentStoreResult<Option<Vec<Document>>> {
        DocumentStore::get(self, secret, collection, criteria).await
    }

    async fn insert(
        &self,
        secret: Option<&str>,
        collection: &str,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<()> {
        DocumentStore::insert(self, secret, collection, payload, index).await
    }

    async fn replace(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<()> {
        DocumentStore::replace(self, secret, collection, criteria, payload, index).await
    }

    async fn modify(
        &self,
        secret: Option<&str>,
        collection: &str,
        criteria: &Criteria,
        patch: &Document,
    ) -> DocumentStoreResult<()> {
        DocumentStore::modify(self, secret, collection, criteria, patch).await
    }

    async fn delete(&self, collection: &str, criteria: &Criteria) -> DocumentStoreResult<()> {
        DocumentStore::delete(self, collection, criteria).await
    }
}
