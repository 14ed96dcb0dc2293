//! The shape of a document body before it is stamped and written.
//!
//! Without a secret, the caller's payload is stored as is. With a secret, the payload is sealed
//! into `{iv, data}` and stored next to the caller's index fields, which stay in cleartext so
//! they remain queryable.

use bson::Document;

use crate::{
    codec::{self, EncryptedPayload},
    error::{DocumentStoreError, DocumentStoreResult},
    expiry::ExpiryStamp,
};

/// A document body selected by whether a secret was supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBody {
    /// The caller's payload, stored verbatim.
    Plaintext(Document),
    /// Cleartext index fields plus the sealed payload.
    Encrypted {
        index: Document,
        payload: EncryptedPayload,
    },
}

impl DocumentBody {
    /// Builds the body for `payload`.
    ///
    /// When `secret` is set, `index` is required: index fields are the only part of an encrypted
    /// document that can still be queried. Without a secret, `index` is ignored.
    pub fn new(
        secret: Option<&str>,
        payload: &Document,
        index: Option<&Document>,
    ) -> DocumentStoreResult<Self> {
        match secret {
            None => Ok(DocumentBody::Plaintext(payload.clone())),
            Some(secret) => {
                let index = index.ok_or(DocumentStoreError::MissingParams)?;

                Ok(DocumentBody::Encrypted {
                    index: index.clone(),
                    payload: codec::seal(payload, secret)?,
                })
            }
        }
    }

    /// Produces the document to persist, with `stamp` merged in.
    ///
    /// Stamp and payload fields take precedence over index fields of the same name.
    pub fn into_document(self, stamp: ExpiryStamp) -> Document {
        let mut document = match self {
            DocumentBody::Plaintext(document) => document,
            DocumentBody::Encrypted { mut index, payload } => {
                for (field, value) in payload.to_document() {
                    index.insert(field, value);
                }
                index
            }
        };

        stamp.apply(&mut document);
        document
    }
}
