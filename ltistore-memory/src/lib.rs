//! In-memory document storage backend for ltistore.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! testing, and single-process deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Equality queries** - Numeric values compare by value across BSON number types
//! - **Optimistic transactions** - Commits fail with a conflict when their reads went stale
//!
//! # Quick Start
//!
//! ```ignore
//! use ltistore::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! let backend = InMemoryStore::builder().build().await?;
//! let store = DocumentStore::new(backend);
//!
//! store.insert(None, "platform", &doc! { "platformUrl": "https://lms.example.com" }, None).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as ltistore_memory;

pub mod store;
mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder, InMemoryTransaction};
