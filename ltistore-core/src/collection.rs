//! Collection naming and collection-scoped backend access.
//!
//! Hosts address collections by logical name (`"accesstoken"`, `"platform"`, ...). A
//! [`CollectionResolver`] maps that name to the physical path the backend stores it under by
//! prepending a configured prefix:
//!
//! - prefix `"ltijs-"` stores `accesstoken` as `ltijs-accesstoken`
//! - prefix `"ltijs/index/"` stores it as the nested path `ltijs/index/accesstoken`
//!
//! [`Collection`] pairs a resolved path with a backend reference so callers don't repeat it.

use bson::{Document, Uuid};

use crate::{
    backend::{StoreBackend, StoredDocument},
    error::DocumentStoreResult,
    query::{Criteria, Query},
};

/// Maps logical collection names to physical paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionResolver {
    prefix: String,
}

impl CollectionResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the physical path for `name`.
    pub fn resolve(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

/// A collection with a reference to a storage backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    path: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(path: String, backend: &'a B) -> Self {
        Self { path, backend }
    }

    /// Returns the physical path of this collection.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns every document matching `criteria`.
    ///
    /// Empty criteria select the whole collection.
    pub async fn find(&self, criteria: &Criteria) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.backend
            .query_documents(Query::matching(criteria), &self.path)
            .await
    }

    /// Stores a new document and returns its generated identifier.
    pub async fn insert(&self, document: Document) -> DocumentStoreResult<Uuid> {
        self.backend
            .insert_document(document, &self.path)
            .await
    }

    /// Sets the given fields on an existing document.
    pub async fn update(&self, id: Uuid, fields: Document) -> DocumentStoreResult<()> {
        self.backend
            .update_document(id, fields, &self.path)
            .await
    }

    /// Deletes documents by identifier in one atomic batch.
    pub async fn delete(&self, ids: Vec<Uuid>) -> DocumentStoreResult<()> {
        self.backend
            .delete_documents(ids, &self.path)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prefix_keeps_the_logical_name() {
        assert_eq!(CollectionResolver::default().resolve("nonce"), "nonce");
    }

    #[test]
    fn prefix_is_prepended_verbatim() {
        assert_eq!(CollectionResolver::new("ltijs-").resolve("accesstoken"), "ltijs-accesstoken");
        assert_eq!(
            CollectionResolver::new("ltijs/index/").resolve("platforms"),
            "ltijs/index/platforms"
        );
    }
}
