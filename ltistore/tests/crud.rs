//! CRUD facade tests against the in-memory backend.

use bson::{Bson, Document, doc};
use ltistore::{memory::InMemoryStore, prelude::*};

const SECRET: &str = "LTIKEY";

fn store() -> (DocumentStore<InMemoryStore>, InMemoryStore) {
    let backend = InMemoryStore::new();
    (DocumentStore::new(backend.clone()), backend)
}

fn by_id(id: &str) -> Criteria {
    Criteria::new().eq("id", id)
}

async fn raw(backend: &InMemoryStore, collection: &str) -> Vec<Document> {
    backend
        .query_documents(Query::new(), collection)
        .await
        .unwrap()
        .into_iter()
        .map(|stored| stored.data)
        .collect()
}

// =============================================================================
// Get / Insert
// =============================================================================

#[tokio::test]
async fn encrypted_insert_reads_back_payload_and_created_at() {
    let (store, backend) = store();

    store
        .insert(Some(SECRET), "widgets", &doc! { "foo": "bar-1" }, Some(&doc! { "id": "id-1" }))
        .await
        .unwrap();

    let found = store.get(Some(SECRET), "widgets", &by_id("id-1")).await.unwrap().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].len(), 2);
    assert_eq!(found[0].get_str("foo").unwrap(), "bar-1");
    assert!(found[0].get_i64("createdAt").unwrap() > 0);

    let stored = raw(&backend, "widgets").await;
    assert!(stored[0].get("foo").is_none());
    assert!(stored[0].get_str("iv").is_ok());
    assert!(stored[0].get_str("data").is_ok());
}

#[tokio::test]
async fn plaintext_insert_ignores_index() {
    let (store, _) = store();

    store
        .insert(None, "widgets", &doc! { "foo": "bar-2" }, Some(&doc! { "id": "id-2" }))
        .await
        .unwrap();

    assert_eq!(store.get(None, "widgets", &by_id("id-2")).await.unwrap(), None);
}

#[tokio::test]
async fn plaintext_get_returns_stored_fields() {
    let (store, _) = store();

    store
        .insert(None, "widgets", &doc! { "id": "id-3", "name": "tyson" }, None)
        .await
        .unwrap();

    let found = store.get(None, "widgets", &by_id("id-3")).await.unwrap().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].len(), 3);
    assert_eq!(found[0].get_str("name").unwrap(), "tyson");
    assert!(matches!(found[0].get("createdAt"), Some(Bson::DateTime(_))));
}

#[tokio::test]
async fn get_matches_every_criteria_field() {
    let (store, _) = store();

    for platform in ["platform-1", "platform-2"] {
        store
            .insert(None, "platform", &doc! { "platformId": platform, "location": "Burnaby" }, None)
            .await
            .unwrap();
    }

    let burnaby = Criteria::new().eq("location", "Burnaby");
    assert_eq!(store.get(None, "platform", &burnaby).await.unwrap().unwrap().len(), 2);

    let exact = burnaby.eq("platformId", "platform-2");
    let found = store.get(None, "platform", &exact).await.unwrap().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_str("platformId").unwrap(), "platform-2");
}

#[tokio::test]
async fn encrypted_documents_sharing_an_index_decrypt_separately() {
    let (store, _) = store();
    let index = doc! { "platformId": "p1", "location": "Van" };

    for name in ["platform-1", "platform-2"] {
        store
            .insert(Some(SECRET), "platform", &doc! { "name": name }, Some(&index))
            .await
            .unwrap();
    }

    let criteria = Criteria::new().eq("platformId", "p1").eq("location", "Van");
    let found = store.get(Some(SECRET), "platform", &criteria).await.unwrap().unwrap();

    let mut names = found
        .iter()
        .map(|payload| payload.get_str("name").unwrap())
        .collect::<Vec<_>>();
    names.sort_unstable();

    assert_eq!(names, vec!["platform-1", "platform-2"]);
    assert!(found.iter().all(|payload| payload.get("platformId").is_none()));
}

#[tokio::test]
async fn large_integer_criteria_match_exactly() {
    let (store, _) = store();

    store
        .insert(None, "widgets", &doc! { "n": 9_007_199_254_740_993_i64 }, None)
        .await
        .unwrap();

    let near = Criteria::new().eq("n", 9_007_199_254_740_992_i64);
    assert_eq!(store.get(None, "widgets", &near).await.unwrap(), None);

    let exact = Criteria::new().eq("n", 9_007_199_254_740_993_i64);
    assert_eq!(store.get(None, "widgets", &exact).await.unwrap().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_secret_stores_plaintext() {
    let (store, backend) = store();

    store
        .insert(Some(""), "widgets", &doc! { "id": "id-4" }, None)
        .await
        .unwrap();

    assert_eq!(raw(&backend, "widgets").await[0].get_str("id").unwrap(), "id-4");
    assert!(store.get(Some(""), "widgets", &by_id("id-4")).await.unwrap().is_some());
}

#[tokio::test]
async fn wrong_secret_cannot_read() {
    let (store, _) = store();

    store
        .insert(Some(SECRET), "widgets", &doc! { "foo": "bar" }, Some(&doc! { "id": "id-5" }))
        .await
        .unwrap();

    assert!(store.get(Some("OTHERKEY"), "widgets", &by_id("id-5")).await.is_err());
}

#[tokio::test]
async fn insert_does_not_enforce_uniqueness() {
    let (store, backend) = store();

    for _ in 0..2 {
        store.insert(None, "widgets", &doc! { "id": "dup" }, None).await.unwrap();
    }

    assert_eq!(raw(&backend, "widgets").await.len(), 2);
}

#[tokio::test]
async fn collection_prefix_applies_to_every_operation() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::with_options(
        backend.clone(),
        StoreOptions::builder().collection_prefix("ltijs-").build(),
    );

    store.insert(None, "platform", &doc! { "id": "p-1" }, None).await.unwrap();
    store
        .replace(None, "platform", &by_id("p-2"), &doc! { "id": "p-2" }, None)
        .await
        .unwrap();

    assert!(raw(&backend, "platform").await.is_empty());
    assert_eq!(raw(&backend, "ltijs-platform").await.len(), 2);
    assert!(store.get(None, "platform", &by_id("p-1")).await.unwrap().is_some());

    store.delete("platform", &by_id("p-1")).await.unwrap();
    assert_eq!(raw(&backend, "ltijs-platform").await.len(), 1);
}

// =============================================================================
// Replace
// =============================================================================

#[tokio::test]
async fn replace_creates_missing_document() {
    let (store, backend) = store();

    store
        .replace(Some(SECRET), "contexttoken", &by_id("ctx-1"), &doc! { "context": "c" }, Some(&doc! { "id": "ctx-1" }))
        .await
        .unwrap();

    let found = store.get(Some(SECRET), "contexttoken", &by_id("ctx-1")).await.unwrap().unwrap();
    assert_eq!(found[0].get_str("context").unwrap(), "c");
    assert_eq!(raw(&backend, "contexttoken").await.len(), 1);
}

#[tokio::test]
async fn replace_overwrites_the_whole_document() {
    let (store, backend) = store();

    store.insert(None, "widgets", &doc! { "id": "w", "old": true }, None).await.unwrap();
    store
        .replace(None, "widgets", &by_id("w"), &doc! { "id": "w", "new": true }, None)
        .await
        .unwrap();

    let stored = raw(&backend, "widgets").await;
    assert_eq!(stored.len(), 1);
    assert!(stored[0].get("old").is_none());
    assert!(stored[0].get_bool("new").unwrap());
}

#[tokio::test]
async fn replace_refuses_ambiguous_criteria() {
    let (store, backend) = store();

    for _ in 0..2 {
        store.insert(None, "widgets", &doc! { "id": "dup" }, None).await.unwrap();
    }

    let result = store
        .replace(None, "widgets", &by_id("dup"), &doc! { "id": "dup", "x": 1 }, None)
        .await;

    assert!(matches!(result, Err(DocumentStoreError::MultipleDocumentsFound(..))));
    assert!(raw(&backend, "widgets").await.iter().all(|doc| doc.get("x").is_none()));
}

#[tokio::test]
async fn replace_requires_index_when_encrypting() {
    let (store, _) = store();

    let result = store
        .replace(Some(SECRET), "widgets", &by_id("w"), &doc! { "x": 1 }, None)
        .await;

    assert!(matches!(result, Err(DocumentStoreError::MissingParams)));
}

// =============================================================================
// Modify
// =============================================================================

#[tokio::test]
async fn modify_sets_plaintext_fields() {
    let (store, _) = store();

    store.insert(None, "platform", &doc! { "id": "p", "name": "old", "keep": 1 }, None).await.unwrap();
    store.modify(None, "platform", &by_id("p"), &doc! { "name": "new", "added": true }).await.unwrap();

    let found = store.get(None, "platform", &by_id("p")).await.unwrap().unwrap();
    assert_eq!(found[0].get_str("name").unwrap(), "new");
    assert!(found[0].get_bool("added").unwrap());
    assert!(found[0].get("keep").is_some());
}

#[tokio::test]
async fn modify_encrypted_applies_only_the_first_patch_field() {
    let (store, backend) = store();

    store
        .insert(Some(SECRET), "platform", &doc! { "a": "1", "b": "2" }, Some(&doc! { "id": "p" }))
        .await
        .unwrap();
    store
        .modify(Some(SECRET), "platform", &by_id("p"), &doc! { "b": "20", "c": "30" })
        .await
        .unwrap();

    let found = store.get(Some(SECRET), "platform", &by_id("p")).await.unwrap().unwrap();
    assert_eq!(found[0].get_str("a").unwrap(), "1");
    assert_eq!(found[0].get_str("b").unwrap(), "20");
    assert!(found[0].get("c").is_none());

    let stored = raw(&backend, "platform").await;
    assert_eq!(stored[0].get_str("id").unwrap(), "p");
}

#[tokio::test]
async fn modify_without_match_is_not_found() {
    let (store, _) = store();

    let result = store.modify(None, "platform", &by_id("missing"), &doc! { "a": 1 }).await;

    assert!(matches!(result, Err(DocumentStoreError::DocumentNotFound(..))));
}

#[tokio::test]
async fn modify_refuses_ambiguous_criteria() {
    let (store, _) = store();

    for _ in 0..2 {
        store.insert(None, "platform", &doc! { "id": "dup" }, None).await.unwrap();
    }

    let result = store.modify(None, "platform", &by_id("dup"), &doc! { "a": 1 }).await;

    assert!(matches!(result, Err(DocumentStoreError::MultipleDocumentsFound(..))));
}

#[tokio::test]
async fn modify_requires_a_patch() {
    let (store, _) = store();

    store.insert(None, "platform", &doc! { "id": "p" }, None).await.unwrap();

    assert!(matches!(
        store.modify(None, "platform", &by_id("p"), &doc! {}).await,
        Err(DocumentStoreError::MissingParams)
    ));
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_removes_every_match() {
    let (store, backend) = store();

    for id in ["dup", "dup", "keep"] {
        store.insert(None, "widgets", &doc! { "id": id }, None).await.unwrap();
    }

    store.delete("widgets", &by_id("dup")).await.unwrap();

    let left = raw(&backend, "widgets").await;
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].get_str("id").unwrap(), "keep");
}

#[tokio::test]
async fn duplicate_pair_blocks_replace_and_modify_until_deleted() {
    let (store, backend) = store();
    let index = doc! { "platformId": "p1", "location": "Van" };
    let criteria = Criteria::new().eq("platformId", "p1").eq("location", "Van");

    for name in ["first", "second"] {
        store
            .insert(Some(SECRET), "platform", &doc! { "name": name }, Some(&index))
            .await
            .unwrap();
    }

    let replaced = store
        .replace(Some(SECRET), "platform", &criteria, &doc! { "name": "third" }, Some(&index))
        .await;
    assert!(matches!(replaced, Err(DocumentStoreError::MultipleDocumentsFound(..))));

    let modified = store
        .modify(Some(SECRET), "platform", &criteria, &doc! { "name": "third" })
        .await;
    assert!(matches!(modified, Err(DocumentStoreError::MultipleDocumentsFound(..))));

    assert_eq!(raw(&backend, "platform").await.len(), 2);

    store.delete("platform", &criteria).await.unwrap();

    assert!(raw(&backend, "platform").await.is_empty());
    assert_eq!(store.get(Some(SECRET), "platform", &criteria).await.unwrap(), None);
}

#[tokio::test]
async fn delete_without_match_succeeds() {
    let (store, _) = store();

    store.delete("widgets", &by_id("nothing")).await.unwrap();
}

// =============================================================================
// Argument validation
// =============================================================================

#[tokio::test]
async fn empty_collection_names_are_rejected() {
    let (store, _) = store();
    let criteria = by_id("x");
    let payload = doc! { "x": 1 };

    assert!(matches!(store.get(None, "", &criteria).await, Err(DocumentStoreError::MissingCollection)));
    assert!(matches!(store.insert(None, "", &payload, None).await, Err(DocumentStoreError::MissingParams)));
    assert!(matches!(
        store.replace(None, "", &criteria, &payload, None).await,
        Err(DocumentStoreError::MissingParams)
    ));
    assert!(matches!(store.modify(None, "", &criteria, &payload).await, Err(DocumentStoreError::MissingParams)));
    assert!(matches!(store.delete("", &criteria).await, Err(DocumentStoreError::MissingParams)));
}

#[tokio::test]
async fn encrypted_insert_requires_index() {
    let (store, _) = store();

    assert!(matches!(
        store.insert(Some(SECRET), "widgets", &doc! { "x": 1 }, None).await,
        Err(DocumentStoreError::MissingParams)
    ));
}

// =============================================================================
// Host interface
// =============================================================================

#[tokio::test]
async fn store_works_behind_the_database_trait() {
    let database: Box<dyn Database> = Box::new(DocumentStore::new(InMemoryStore::new()));

    database.setup().await.unwrap();
    database
        .insert(Some(SECRET), "state", &doc! { "state": "s-1" }, Some(&doc! { "state": "s-1" }))
        .await
        .unwrap();

    let found = database
        .get(Some(SECRET), "state", &Criteria::new().eq("state", "s-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found[0].get_str("state").unwrap(), "s-1");

    database.delete("state", &Criteria::new().eq("state", "s-1")).await.unwrap();
    assert_eq!(database.get(Some(SECRET), "state", &Criteria::new().eq("state", "s-1")).await.unwrap(), None);

    database.close().await.unwrap();
}
