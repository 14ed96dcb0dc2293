//! Time-to-live stamping and expiry checks.
//!
//! Every document written through the facade carries a `createdAt` timestamp and, when its
//! collection has a TTL, an `expiresAt` timestamp. Reads drop documents whose `expiresAt` lies in
//! the past; nothing is physically deleted here.
//!
//! Expiry checks fail open: a missing or malformed `expiresAt` means "not expired".

use std::collections::HashMap;

use bson::{Bson, DateTime, Document};
use chrono::{Duration, Utc};

/// Field holding the write time of a document.
pub const CREATED_AT: &str = "createdAt";
/// Field holding the instant after which a document is no longer returned by reads.
pub const EXPIRES_AT: &str = "expiresAt";

/// Built-in TTLs, in minutes, for the collections an LTI provider writes short-lived records to.
pub const DEFAULT_EXPIRY_MINUTES: [(&str, u32); 5] = [
    ("accesstoken", 60),
    ("contexttoken", 24 * 60),
    ("idtoken", 24 * 60),
    ("nonce", 2),
    ("state", 10),
];

/// Returns [`DEFAULT_EXPIRY_MINUTES`] as an owned table.
pub fn default_expiry_minutes() -> HashMap<String, u32> {
    DEFAULT_EXPIRY_MINUTES
        .iter()
        .map(|(collection, minutes)| (collection.to_string(), *minutes))
        .collect()
}

/// The pair of timestamps merged into a document on insert and replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryStamp {
    pub created_at: DateTime,
    pub expires_at: Option<DateTime>,
}

impl ExpiryStamp {
    /// Writes the stamp into `document`, overwriting any previous stamp.
    ///
    /// An `expiresAt` left over from an earlier write is removed when the stamp has none.
    pub fn apply(&self, document: &mut Document) {
        document.insert(CREATED_AT, self.created_at);
        match self.expires_at {
            Some(expires_at) => {
                document.insert(EXPIRES_AT, expires_at);
            }
            None => {
                document.remove(EXPIRES_AT);
            }
        }
    }
}

/// Per-collection TTL lookup, keyed by logical collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    minutes: HashMap<String, u32>,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(default_expiry_minutes())
    }
}

impl ExpiryPolicy {
    /// Builds a policy from a table of TTLs in minutes. Zero means "never expires".
    pub fn new(minutes: HashMap<String, u32>) -> Self {
        Self { minutes }
    }

    /// Returns the TTL of `collection`, if it has one.
    pub fn ttl(&self, collection: &str) -> Option<Duration> {
        self.minutes
            .get(collection)
            .copied()
            .filter(|minutes| *minutes > 0)
            .map(|minutes| Duration::minutes(minutes.into()))
    }

    /// Stamps a write to `collection` happening now.
    pub fn stamp(&self, collection: &str) -> ExpiryStamp {
        self.stamp_at(collection, Utc::now())
    }

    /// Stamps a write to `collection` happening at `now`.
    pub fn stamp_at(&self, collection: &str, now: chrono::DateTime<Utc>) -> ExpiryStamp {
        ExpiryStamp {
            created_at: DateTime::from_chrono(now),
            expires_at: self
                .ttl(collection)
                .map(|ttl| DateTime::from_chrono(now + ttl)),
        }
    }

    /// Returns true if `document` carries a valid `expiresAt` strictly before now.
    pub fn is_expired(document: &Document) -> bool {
        Self::is_expired_at(document, Utc::now())
    }

    /// Returns true if `document` carries a valid `expiresAt` strictly before `now`.
    pub fn is_expired_at(document: &Document, now: chrono::DateTime<Utc>) -> bool {
        match document.get(EXPIRES_AT) {
            Some(Bson::DateTime(expires_at)) => expires_at.to_chrono() < now,
            _ => false,
        }
    }
}
