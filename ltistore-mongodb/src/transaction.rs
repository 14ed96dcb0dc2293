//! Session-backed transactions for the MongoDB backend.

use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Uuid, doc};
use mongodb::{
    ClientSession,
    error::{Error as MongoError, ErrorKind, WriteFailure},
};
use tracing::trace;

use ltistore_core::{
    backend::{StoreTransaction, StoredDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};

use crate::{
    query::MongoQueryTranslator,
    store::{MongoDbStore, map_error, prepare_document, restore_document},
};

/// Collection holding one guard document per filter a transaction created a document under.
pub const GUARD_COLLECTION: &str = "ltistore_guards";

const DUPLICATE_KEY: i32 = 11000;


/// Identifies the guard document for `filter` over `collection`.
///
/// Filters are built from sorted criteria, so equal criteria always yield the same identifier.
pub(crate) fn guard_id(collection: &str, filter: &Document) -> String {
    format!("{collection}|{filter}")
}

/// Maps a failed guard write. Losing an upsert race on a fresh guard is a conflict too.
fn map_guard_error(err: MongoError) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            DocumentStoreError::Conflict(err.to_string())
        }
        _ => map_error(err),
    }
}


/// A multi-document transaction running on its own client session.
///
/// The server provides snapshot isolation; a write conflict with a concurrent transaction
/// surfaces as [`DocumentStoreError::Conflict`].
/// Dropping the transaction ends the session, which aborts anything not committed.
///
/// Snapshot isolation does not protect an empty read: two transactions that both find nothing
/// would both create a document. Before creating, the transaction therefore bumps a guard
/// document in [`GUARD_COLLECTION`] for every filter that came back empty, so concurrent
/// creators write the same document and all but one abort.
pub struct MongoDbTransaction<'a> {
    store: &'a MongoDbStore,
    session: ClientSession,
    /// (collection, filter) of every read that matched nothing.
    empty_reads: Vec<(String, Document)>,
}

impl<'a> MongoDbTransaction<'a> {
    pub(crate) async fn start(store: &'a MongoDbStore) -> DocumentStoreResult<Self> {
        let mut session = store.client().start_session().await.map_err(map_error)?;
        session.start_transaction().await.map_err(map_error)?;

        Ok(Self {
            store,
            session,
            empty_reads: Vec::new(),
        })
    }

    async fn claim_guards(&mut self, collection: &str) -> DocumentStoreResult<()> {
        let guards = self.empty_reads
            .iter()
            .filter(|(read, _)| read == collection)
            .map(|(read, filter)| guard_id(read, filter))
            .collect::<Vec<_>>();

        for guard in guards {
            self.store
                .get_collection(GUARD_COLLECTION)
                .update_one(
                    doc! { "_id": guard.as_str() },
                    doc! { "$inc": { "claims": 1_i64 } },
                )
                .upsert(true)
                .session(&mut self.session)
                .await
                .map_err(map_guard_error)?;

            trace!(guard = %guard, "claimed guard");
        }

        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MongoDbTransaction<'_> {
    async fn query_documents(&mut self, query: Query, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        let filter = MongoQueryTranslator::translate(&query)?;
        let mut cursor = self.store
            .get_collection(collection)
            .find(filter.clone())
            .session(&mut self.session)
            .await
            .map_err(map_error)?;

        let found = cursor
            .stream(&mut self.session)
            .try_collect::<Vec<Document>>()
            .await
            .map_err(map_error)?;

        if found.is_empty() {
            self.empty_reads.push((collection.to_string(), filter));
        }

        found
            .into_iter()
            .map(restore_document)
            .collect()
    }

    async fn set_document(&mut self, id: Option<Uuid>, document: Document, collection: &str) -> DocumentStoreResult<Uuid> {
        match id {
            Some(id) => {
                self.store
                    .get_collection(collection)
                    .replace_one(doc! { "_id": id }, prepare_document(id, document))
                    .upsert(true)
                    .session(&mut self.session)
                    .await
                    .map_err(map_error)?;

                Ok(id)
            }
            None => {
                self.claim_guards(collection).await?;

                let id = Uuid::new();
                self.store
                    .get_collection(collection)
                    .insert_one(prepare_document(id, document))
                    .session(&mut self.session)
                    .await
                    .map_err(map_error)?;

                Ok(id)
            }
        }
    }

    async fn commit(self: Box<Self>) -> DocumentStoreResult<()> {
        let MongoDbTransaction { mut session, .. } = *self;
        session.commit_transaction().await.map_err(map_error)?;

        trace!("committed transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DocumentStoreResult<()> {
        let MongoDbTransaction { mut session, .. } = *self;
        session.abort_transaction().await.map_err(map_error)?;

        trace!("rolled back transaction");
        Ok(())
    }
}
