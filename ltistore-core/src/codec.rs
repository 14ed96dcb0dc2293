//! Payload encryption using AES-256-CBC.
//!
//! The symmetric key is the SHA-256 digest of the caller's secret. Each encryption draws a fresh
//! random 16-byte IV, and both the IV and the ciphertext are stored hex encoded in the document
//! fields `iv` and `data`.
//!
//! # Known limitation
//!
//! CBC without a MAC is malleable: a modified ciphertext is only rejected when its padding
//! happens to become invalid. Decryption does not detect tampering.

use aes::{
    Aes256,
    cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7},
};
use bson::{Bson, Document};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DocumentStoreError, DocumentStoreResult};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Field holding the hex encoded IV.
pub const IV_FIELD: &str = "iv";
/// Field holding the hex encoded ciphertext.
pub const DATA_FIELD: &str = "data";

const IV_LEN: usize = 16;

/// An encrypted payload as it is stored: hex IV plus hex ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub iv: String,
    pub data: String,
}

impl EncryptedPayload {
    /// Reads the `iv`/`data` pair out of a stored document.
    pub fn from_document(document: &Document) -> DocumentStoreResult<Self> {
        match (document.get(IV_FIELD), document.get(DATA_FIELD)) {
            (Some(Bson::String(iv)), Some(Bson::String(data))) => Ok(Self {
                iv: iv.clone(),
                data: data.clone(),
            }),
            _ => Err(DocumentStoreError::Encryption(
                "document has no encrypted payload".to_string(),
            )),
        }
    }

    /// Returns the `{iv, data}` fields as a document.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(IV_FIELD, self.iv.clone());
        document.insert(DATA_FIELD, self.data.clone());
        document
    }
}

/// Derives the 256-bit AES key for `secret`.
pub fn derive_key(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Encrypts `plaintext` under `secret` with a freshly generated IV.
pub fn encrypt(plaintext: &str, secret: &str) -> DocumentStoreResult<EncryptedPayload> {
    let key = derive_key(secret);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new_from_slices(&key, &iv)
        .map_err(|e| DocumentStoreError::Encryption(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    Ok(EncryptedPayload {
        iv: hex::encode(iv),
        data: hex::encode(ciphertext),
    })
}

/// Decrypts `payload` under `secret`.
///
/// Fails if either field is not valid hex, the IV has the wrong length, the padding is invalid,
/// or the plaintext is not UTF-8.
pub fn decrypt(payload: &EncryptedPayload, secret: &str) -> DocumentStoreResult<String> {
    let key = derive_key(secret);
    let iv = hex::decode(&payload.iv)
        .map_err(|e| DocumentStoreError::Encryption(format!("invalid iv: {e}")))?;
    let ciphertext = hex::decode(&payload.data)
        .map_err(|e| DocumentStoreError::Encryption(format!("invalid ciphertext: {e}")))?;

    let plaintext = Aes256CbcDec::new_from_slices(&key, &iv)
        .map_err(|_| DocumentStoreError::Encryption(format!("iv must be {IV_LEN} bytes")))?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| DocumentStoreError::Encryption("bad padding".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|e| DocumentStoreError::Encryption(e.to_string()))
}

/// Serializes `payload` to JSON and encrypts it.
pub fn seal(payload: &Document, secret: &str) -> DocumentStoreResult<EncryptedPayload> {
    encrypt(&serde_json::to_string(payload)?, secret)
}

/// Decrypts the `iv`/`data` fields of `document` and parses the JSON payload they hold.
pub fn open(document: &Document, secret: &str) -> DocumentStoreResult<Document> {
    let json = decrypt(&EncryptedPayload::from_document(document)?, secret)?;

    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use proptest::prelude::*;

    #[test]
    fn key_is_the_sha256_of_the_secret() {
        assert_eq!(
            hex::encode(derive_key("LTIKEY")),
            hex::encode(Sha256::digest(b"LTIKEY"))
        );
        assert_eq!(derive_key("LTIKEY").len(), 32);
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let payload = encrypt(r#"{"foo":"bar-1"}"#, "LTIKEY").unwrap();

        assert_eq!(payload.iv.len(), IV_LEN * 2);
        assert_eq!(payload.data.len() % 32, 0);
        assert_eq!(decrypt(&payload, "LTIKEY").unwrap(), r#"{"foo":"bar-1"}"#);
    }

    #[test]
    fn same_plaintext_gets_a_fresh_iv() {
        let first = encrypt("same document content", "LTIKEY").unwrap();
        let second = encrypt("same document content", "LTIKEY").unwrap();

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.data, second.data);
    }

    #[test]
    fn decrypts_with_the_stored_iv() {
        let key = derive_key("LTIKEY");
        let iv: [u8; 16] = core::array::from_fn(|i| i as u8);
        let ciphertext = Aes256CbcEnc::new_from_slices(&key, &iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(b"{}");

        let payload = EncryptedPayload { iv: hex::encode(iv), data: hex::encode(ciphertext) };

        assert_eq!(decrypt(&payload, "LTIKEY").unwrap(), "{}");
    }

    #[test]
    fn wrong_secret_does_not_yield_the_plaintext() {
        let payload = encrypt(r#"{"foo":"bar"}"#, "LTIKEY").unwrap();

        assert_ne!(decrypt(&payload, "OTHERKEY").ok().as_deref(), Some(r#"{"foo":"bar"}"#));
    }

    #[test]
    fn malformed_fields_are_rejected() {
        let payload = encrypt("hello", "LTIKEY").unwrap();

        let short_iv = EncryptedPayload { iv: "00ff".into(), data: payload.data.clone() };
        assert!(matches!(decrypt(&short_iv, "LTIKEY"), Err(DocumentStoreError::Encryption(_))));

        let not_hex = EncryptedPayload { iv: payload.iv.clone(), data: "zz".into() };
        assert!(matches!(decrypt(&not_hex, "LTIKEY"), Err(DocumentStoreError::Encryption(_))));

        let truncated = EncryptedPayload { iv: payload.iv, data: payload.data[..30].to_string() };
        assert!(matches!(decrypt(&truncated, "LTIKEY"), Err(DocumentStoreError::Encryption(_))));
    }

    #[test]
    fn seal_and_open_documents() {
        let sealed = seal(&doc! { "foo": "bar-1", "nested": { "ok": true } }, "LTIKEY").unwrap();
        let mut stored = doc! { "id": "id-1" };
        for (field, value) in sealed.to_document() {
            stored.insert(field, value);
        }

        let opened = open(&stored, "LTIKEY").unwrap();

        assert_eq!(opened.get_str("foo").unwrap(), "bar-1");
        assert!(opened.get_document("nested").unwrap().get_bool("ok").unwrap());
    }

    #[test]
    fn open_requires_payload_fields() {
        assert!(matches!(
            open(&doc! { "id": "id-1" }, "LTIKEY"),
            Err(DocumentStoreError::Encryption(_))
        ));
    }

    proptest! {
        #[test]
        fn roundtrip_any_plaintext(plaintext in ".*", secret in ".+") {
            let payload = encrypt(&plaintext, &secret).unwrap();

            prop_assert_eq!(decrypt(&payload, &secret).unwrap(), plaintext);
        }
    }
}
