//! Convenient re-exports of commonly used types from ltistore.
//!
//! ```ignore
//! use ltistore::prelude::*;
//! ```

pub use ltistore_core::{
    store::DocumentStore,
    database::Database,
    options::{StoreOptions, StoreOptionsBuilder},
    collection::{Collection, CollectionResolver},
    backend::{StoreBackend, StoreBackendBuilder, StoreTransaction, StoredDocument},
    query::{Criteria, FieldValue, Query, QueryBuilder, QueryVisitor, Expr, Filter},
    expiry::{ExpiryPolicy, ExpiryStamp},
    error::{DocumentStoreError, DocumentStoreResult},
};
