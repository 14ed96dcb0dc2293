//! Error types and result types for adapter operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`]. The first five
//! variants of [`DocumentStoreError`] are the caller-visible taxonomy of the CRUD facade; the rest
//! describe failures of the codec or of the underlying store.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with the adapter.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// No collection name was supplied to a read.
    #[error("MISSING_COLLECTION")]
    MissingCollection,
    /// A required argument was empty, or a secret was given without index fields.
    #[error("MISSING_PARAMS")]
    MissingParams,
    /// Nothing matched where exactly one document was required.
    /// The first argument describes what was looked up, the second where.
    #[error("DOCUMENT_NOT_FOUND: {0} in {1}")]
    DocumentNotFound(String, String),
    /// More than one document matched a query that must identify a single record.
    /// The first argument is the collection path, the second the query.
    #[error("MULTIPLE_DOCUMENTS_FOUND: {0} | {1}")]
    MultipleDocumentsFound(String, String),
    /// A transactional write did not complete. Retrying is left to the caller.
    #[error("TRANSACTION_ERROR: {0}")]
    Transaction(String),
    /// The store aborted a transaction because of a conflicting concurrent write.
    #[error("Transaction conflict: {0}")]
    Conflict(String),
    /// Payload encryption or decryption failed.
    #[error("Encryption error: {0}")]
    Encryption(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The document has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for adapter operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl DocumentStoreError {
    /// Folds a failure raised inside a transactional write into [`DocumentStoreError::Transaction`].
    ///
    /// Uniqueness violations keep their identity so callers can tell a data-integrity problem
    /// apart from a retryable abort.
    pub fn into_transaction_error(self) -> Self {
        match self {
            err @ (DocumentStoreError::MultipleDocumentsFound(..)
            | DocumentStoreError::Transaction(_)) => err,
            other => DocumentStoreError::Transaction(other.to_string()),
        }
    }
}

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_error_wraps_conflicts() {
        let err = DocumentStoreError::Conflict("write skew".into()).into_transaction_error();

        assert!(matches!(err, DocumentStoreError::Transaction(reason) if reason.contains("write skew")));
    }

    #[test]
    fn transaction_error_keeps_uniqueness_violations() {
        let err = DocumentStoreError::MultipleDocumentsFound("nonce".into(), "{}".into())
            .into_transaction_error();

        assert!(matches!(err, DocumentStoreError::MultipleDocumentsFound(..)));
    }
}
