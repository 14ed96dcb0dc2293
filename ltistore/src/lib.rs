//! Main ltistore crate providing the persistence adapter for LTI tool providers.
//!
//! This crate is the primary entry point for hosts. It re-exports the core types and
//! functionality from the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **CRUD facade** - Get, Insert, Replace, Modify and Delete over flat equality criteria
//! - **Expiry** - Per-collection TTLs stamped on write and enforced on read
//! - **Payload encryption** - Records sealed under a host secret, with cleartext index fields
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use ltistore::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::with_options(
//!         InMemoryStore::builder().build().await?,
//!         StoreOptions::builder().collection_prefix("ltijs-").build(),
//!     );
//!     store.setup().await?;
//!
//!     // Encrypted: the payload is sealed, `id` stays queryable
//!     store
//!         .insert(Some("LTIKEY"), "idtoken", &doc! { "iss": "https://lms.example.com" }, Some(&doc! { "id": "id-1" }))
//!         .await?;
//!
//!     let tokens = store
//!         .get(Some("LTIKEY"), "idtoken", &Criteria::new().eq("id", "id-1"))
//!         .await?;
//!
//!     println!("Found tokens: {:?}", tokens);
//!
//!     store.close().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! Hosts that pick the backend at runtime hold the store as a `Box<dyn Database>`:
//!
//! ```ignore
//! use ltistore::{prelude::*, memory::InMemoryStore};
//!
//! let database: Box<dyn Database> = Box::new(DocumentStore::new(InMemoryStore::new()));
//! database.delete("nonce", &Criteria::new().eq("nonce", "abc")).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development, tests and single-process hosts
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use ltistore_core::{backend, codec, collection, database, document, error, expiry, options, query, store};

// Re-export BSON types for convenience
pub use bson;

/// Attribute macro for implementing [`backend::StoreBackend`] on custom backends.
pub use async_trait::async_trait;

/// In-memory storage backend implementations.
pub mod memory {
    pub use ltistore_memory::{InMemoryStore, InMemoryStoreBuilder, InMemoryTransaction};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use ltistore_mongodb::{
        MongoDbStore, MongoDbStoreBuilder, MongoDbTransaction,
        store::{DATABASE_ENV, URI_ENV},
        transaction::GUARD_COLLECTION,
    };
}
