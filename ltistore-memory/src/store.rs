//! In-memory storage implementation for document stores.
//!
//! Documents live in per-collection HashMaps behind an async-aware read-write lock. Every write
//! stamps the touched document with a new version taken from a store-wide counter, which is
//! what [`InMemoryTransaction`] validates against on commit.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Document, Uuid};
use tracing::{debug, trace};

use ltistore_core::{
    query::Query,
    error::{DocumentStoreError, DocumentStoreResult},
    backend::{StoreBackend, StoreBackendBuilder, StoreTransaction, StoredDocument},
};

use crate::evaluator::DocumentEvaluator;

#[derive(Debug, Clone)]
struct Entry {
    id: Uuid,
    version: u64,
    data: Document,
}

/// document_id -> entry
type CollectionMap = HashMap<String, Entry>;

/// Identifiers and versions of the documents a query matched, sorted by identifier.
type Snapshot = Vec<(String, u64)>;

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<String, CollectionMap>,
    version: u64,
}

impl StoreState {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn matching<'a>(&'a self, query: &'a Query, collection: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.collections
            .get(collection)
            .into_iter()
            .flat_map(|collection_map| collection_map.values())
            .filter(move |entry| DocumentEvaluator::matches(&entry.data, query.filter.as_ref()))
    }

    fn snapshot(&self, query: &Query, collection: &str) -> Snapshot {
        let mut snapshot = self
            .matching(query, collection)
            .map(|entry| (entry.id.to_string(), entry.version))
            .collect::<Vec<_>>();

        snapshot.sort_unstable();
        snapshot
    }

    fn put(&mut self, id: Uuid, data: Document, collection: &str) {
        let version = self.next_version();

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), Entry { id, version, data });
    }
}


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones share the
/// same underlying data.
///
/// Queries scan every document of a collection; there is no indexing.
///
/// # Example
///
/// ```ignore
/// use ltistore_memory::InMemoryStore;
/// use ltistore::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_document(doc! { "name": "Alice" }, "users").await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        let state = self.state.read().await;

        Ok(
            state
                .matching(&query, collection)
                .map(|entry| StoredDocument::new(entry.id, entry.data.clone()))
                .collect()
        )
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<Uuid> {
        let id = Uuid::new();
        self.state
            .write()
            .await
            .put(id, document, collection);

        trace!(collection, %id, "inserted document");
        Ok(id)
    }

    async fn update_document(&self, id: Uuid, fields: Document, collection: &str) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;
        let version = state.next_version();

        let entry = state
            .collections
            .get_mut(collection)
            .and_then(|collection_map| collection_map.get_mut(&id.to_string()))
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()))?;

        for (field, value) in fields {
            entry.data.insert(field, value);
        }
        entry.version = version;

        trace!(collection, %id, "updated document");
        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;
        let collection_map = match state.collections.get_mut(collection) {
            Some(col) => col,
            None => return Ok(()),
        };

        let removed = ids
            .iter()
            .filter(|id| collection_map.remove(&id.to_string()).is_some())
            .count();

        debug!(collection, requested = ids.len(), removed, "deleted documents");
        Ok(())
    }

    async fn begin_transaction<'a>(&'a self) -> DocumentStoreResult<Box<dyn StoreTransaction + 'a>> {
        Ok(Box::new(InMemoryTransaction::new(self.state.clone())))
    }
}


#[derive(Debug)]
struct ReadRecord {
    collection: String,
    query: Query,
    snapshot: Snapshot,
}

#[derive(Debug)]
struct PendingWrite {
    id: Uuid,
    document: Document,
    collection: String,
}

/// An optimistic transaction over an [`InMemoryStore`].
///
/// Reads take the shared lock only for their own duration and remember which documents (and at
/// which version) they matched. Writes are buffered. On commit the exclusive lock is taken, every
/// recorded read is evaluated again, and the commit fails with
/// [`DocumentStoreError::Conflict`] if any result changed; otherwise the buffered writes are
/// applied while the lock is still held.
#[derive(Debug)]
pub struct InMemoryTransaction {
    state: Arc<RwLock<StoreState>>,
    reads: Vec<ReadRecord>,
    writes: Vec<PendingWrite>,
}

impl InMemoryTransaction {
    fn new(state: Arc<RwLock<StoreState>>) -> Self {
        Self {
            state,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn query_documents(&mut self, query: Query, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        if !self.writes.is_empty() {
            return Err(DocumentStoreError::Transaction(
                "reads must precede writes within a transaction".to_string(),
            ));
        }

        let state = self.state.read().await;
        let matches = state
            .matching(&query, collection)
            .map(|entry| StoredDocument::new(entry.id, entry.data.clone()))
            .collect::<Vec<_>>();
        let snapshot = state.snapshot(&query, collection);
        drop(state);

        self.reads.push(ReadRecord {
            collection: collection.to_string(),
            query,
            snapshot,
        });

        Ok(matches)
    }

    async fn set_document(&mut self, id: Option<Uuid>, document: Document, collection: &str) -> DocumentStoreResult<Uuid> {
        let id = id.unwrap_or_else(Uuid::new);

        self.writes.push(PendingWrite {
            id,
            document,
            collection: collection.to_string(),
        });

        Ok(id)
    }

    async fn commit(self: Box<Self>) -> DocumentStoreResult<()> {
        let InMemoryTransaction { state, reads, writes } = *self;
        let mut state = state.write().await;

        for read in &reads {
            if state.snapshot(&read.query, &read.collection) != read.snapshot {
                debug!(collection = %read.collection, "transaction read set changed before commit");

                return Err(DocumentStoreError::Conflict(format!(
                    "documents matched in {} changed before commit",
                    read.collection
                )));
            }
        }

        let applied = writes.len();
        for write in writes {
            state.put(write.id, write.document, &write.collection);
        }

        trace!(reads = reads.len(), writes = applied, "committed transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DocumentStoreResult<()> {
        trace!(discarded = self.writes.len(), "rolled back transaction");
        Ok(())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use ltistore_memory::InMemoryStore;
/// use ltistore::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
