//! Construction-time configuration of the adapter.
//!
//! Options can be built fluently or deserialized from the host's configuration:
//!
//! ```ignore
//! use ltistore::options::StoreOptions;
//!
//! let options = StoreOptions::builder()
//!     .collection_prefix("ltijs-")
//!     .expires_in("platformStatus", 5)
//!     .build();
//!
//! let options: StoreOptions = serde_json::from_str(r#"{ "collectionPrefix": "ltijs/index/" }"#)?;
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{collection::CollectionResolver, expiry::{ExpiryPolicy, default_expiry_minutes}};

/// Configuration fixed when a [`DocumentStore`](crate::store::DocumentStore) is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreOptions {
    /// Prepended to every logical collection name. Empty by default.
    pub collection_prefix: String,
    /// TTL in minutes per logical collection name. Zero or absent means "never expires".
    pub expires_in_minutes: HashMap<String, u32>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            collection_prefix: String::new(),
            expires_in_minutes: default_expiry_minutes(),
        }
    }
}

impl StoreOptions {
    pub fn builder() -> StoreOptionsBuilder {
        StoreOptionsBuilder::default()
    }

    pub fn resolver(&self) -> CollectionResolver {
        CollectionResolver::new(self.collection_prefix.clone())
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.expires_in_minutes.clone())
    }
}

/// Builder for [`StoreOptions`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct StoreOptionsBuilder {
    options: StoreOptions,
}

impl StoreOptionsBuilder {
    /// Sets the prefix prepended to every collection path.
    pub fn collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.collection_prefix = prefix.into();
        self
    }

    /// Gives `collection` a TTL of `minutes`.
    pub fn expires_in(mut self, collection: impl Into<String>, minutes: u32) -> Self {
        self.options
            .expires_in_minutes
            .insert(collection.into(), minutes);
        self
    }

    /// Removes any TTL configured for `collection`.
    pub fn never_expires(mut self, collection: &str) -> Self {
        self.options.expires_in_minutes.remove(collection);
        self
    }

    pub fn build(self) -> StoreOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_token_ttls() {
        let options = StoreOptions::default();

        assert_eq!(options.collection_prefix, "");
        assert_eq!(options.expires_in_minutes.get("accesstoken"), Some(&60));
        assert_eq!(options.expires_in_minutes.get("contexttoken"), Some(&1440));
        assert_eq!(options.expires_in_minutes.get("idtoken"), Some(&1440));
        assert_eq!(options.expires_in_minutes.get("nonce"), Some(&2));
        assert_eq!(options.expires_in_minutes.get("state"), Some(&10));
    }

    #[test]
    fn builder_overrides_defaults() {
        let options = StoreOptions::builder()
            .collection_prefix("ltijs-")
            .expires_in("nonce", 5)
            .never_expires("state")
            .build();

        assert_eq!(options.resolver().resolve("nonce"), "ltijs-nonce");
        assert_eq!(options.expires_in_minutes.get("nonce"), Some(&5));
        assert!(options.expiry_policy().ttl("state").is_none());
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let options: StoreOptions =
            serde_json::from_str(r#"{ "collectionPrefix": "ltijs/index/" }"#).unwrap();

        assert_eq!(options.collection_prefix, "ltijs/index/");
        assert_eq!(options.expires_in_minutes, default_expiry_minutes());
    }
}
