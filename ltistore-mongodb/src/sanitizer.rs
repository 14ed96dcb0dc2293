//! Field name escaping for MongoDB compatibility.
//!
//! MongoDB reserves dots and dollar signs in field names for query syntax and rejects NUL bytes.
//! Hosts may still use such names in their payloads (for instance claim URIs in an unencrypted
//! token), so keys are escaped on the way in and restored on the way out. Values are left alone:
//! they are data, and rewriting them would break equality matching.

use bson::{Bson, Document};


/// Escapes and restores document keys around MongoDB field name restrictions.
pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Escapes every key of `document`, recursing into nested documents and arrays.
    pub(crate) fn escape_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::escape_key(&key), Self::escape_value(value)))
            .collect()
    }

    /// Reverts [`escape_document`](Self::escape_document).
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore_key(&key), Self::restore_value(value)))
            .collect()
    }

    pub(crate) fn escape_key(input: &str) -> String {
        let mut escaped = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            escaped = escaped.replace(*target, *replacement);
        }
        escaped
    }

    pub(crate) fn restore_key(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }

    fn escape_value(value: Bson) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(Self::escape_document(doc)),
            Bson::Array(arr) => Bson::Array(arr.into_iter().map(Self::escape_value).collect()),
            other => other,
        }
    }

    fn restore_value(value: Bson) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(Self::restore_document(doc)),
            Bson::Array(arr) => Bson::Array(arr.into_iter().map(Self::restore_value).collect()),
            other => other,
        }
    }
}
