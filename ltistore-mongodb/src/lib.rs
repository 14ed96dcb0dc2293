//! MongoDB backend implementation for ltistore.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait, for hosts
//! that run several processes against one shared database.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! ltistore = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Session transactions** - Replace runs inside a server-side multi-document transaction
//! - **Key escaping** - Field names containing `.`, `$` or NUL survive a round trip
//!
//! Transactions require a replica set or sharded cluster; a standalone server rejects them.
//!
//! # Example
//!
//! ```ignore
//! use ltistore::{backend::StoreBackendBuilder, mongodb::MongoDbStoreBuilder};
//!
//! let backend = MongoDbStoreBuilder::from_env()?.build().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as ltistore_mongodb;

pub mod store;
pub mod transaction;
mod query;
mod sanitizer;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
pub use transaction::MongoDbTransaction;
