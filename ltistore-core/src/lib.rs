//! A document-store persistence adapter for LTI tool providers.
//!
//! This crate is the core of the ltistore project and provides:
//!
//! - **CRUD facade** ([`store`]) - Get/Insert/Replace/Modify/Delete over any backend
//! - **Host interface** ([`database`]) - Object-safe trait the host application plugs in
//! - **Store backend abstraction** ([`backend`]) - Traits for queries, writes and transactions
//! - **Equality queries** ([`query`]) - Criteria maps and the filter builder
//! - **Collection paths** ([`collection`]) - Prefix-based collection naming
//! - **Expiry** ([`expiry`]) - Per-collection TTL stamping and expired-document filtering
//! - **Payload encryption** ([`codec`]) - AES-256-CBC sealing of payloads under a secret
//! - **Options** ([`options`]) - Construction-time configuration
//! - **Error handling** ([`error`]) - Error taxonomy and result type
//!
//! # Example
//!
//! ```ignore
//! use ltistore::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::with_options(
//!     InMemoryStore::new(),
//!     StoreOptions::builder().collection_prefix("ltijs-").build(),
//! );
//!
//! store.insert(None, "platform", &doc! { "platformUrl": "https://lms.example.com" }, None).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as ltistore_core;

pub mod backend;
pub mod codec;
pub mod collection;
pub mod database;
pub mod document;
pub mod error;
pub mod expiry;
pub mod options;
pub mod query;
pub mod store;
