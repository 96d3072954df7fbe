//! Replication handlers: idempotency, cascade, and link direction.

use std::sync::Arc;

use serde_json::json;

use books_service::handler_registry;
use books_service::repository::memory::InMemoryStore;
use books_service::repository::BookRepository;
use books_service::NewBook;

fn store_and_registry() -> (Arc<InMemoryStore>, libris_core::events::HandlerRegistry) {
    let store = Arc::new(InMemoryStore::new());
    let registry = handler_registry(store.clone(), store.clone()).unwrap();
    (store, registry)
}

async fn seed_book(store: &InMemoryStore, title: &str) -> i64 {
    store
        .insert(&NewBook {
            title: title.to_string(),
            isbn: None,
            publication_year: None,
        })
        .await
        .unwrap()
        .id
}

#[test]
fn registry_covers_all_consumed_topics() {
    let (_store, registry) = store_and_registry();
    assert_eq!(
        registry.topics(),
        vec![
            "author.created",
            "author.deleted",
            "author.updated",
            "author_book.linked",
            "author_book.unlinked",
        ]
    );
}

#[tokio::test]
async fn author_created_and_updated_upsert_the_cache() {
    let (store, registry) = store_and_registry();

    registry
        .get("author.created")
        .unwrap()
        .handle(json!({ "author_id": 1, "name": "J. L. Borges" }))
        .await
        .unwrap();
    registry
        .get("author.updated")
        .unwrap()
        .handle(json!({ "author_id": 1, "name": "Jorge Luis Borges", "nationality": "Argentinian" }))
        .await
        .unwrap();

    let cached = store.cached_author(1).unwrap();
    assert_eq!(cached.name, "Jorge Luis Borges");
    assert_eq!(cached.nationality.as_deref(), Some("Argentinian"));
}

#[tokio::test]
async fn replaying_a_delete_is_idempotent() {
    let (store, registry) = store_and_registry();

    registry
        .get("author.created")
        .unwrap()
        .handle(json!({ "author_id": 2, "name": "Cortazar" }))
        .await
        .unwrap();

    let handler = registry.get("author.deleted").unwrap();
    handler.handle(json!({ "author_id": 2 })).await.unwrap();
    handler.handle(json!({ "author_id": 2 })).await.unwrap();

    assert!(store.cached_author(2).is_none());
}

#[tokio::test]
async fn linked_event_stores_the_pair_in_local_orientation() {
    let (store, registry) = store_and_registry();
    let book_id = seed_book(&store, "Seven Madmen").await;

    // payload field order is the publisher's; rows here are (book, author)
    registry
        .get("author_book.linked")
        .unwrap()
        .handle(json!({ "author_id": 5, "book_id": book_id }))
        .await
        .unwrap();

    assert_eq!(store.links(), vec![(book_id, 5)]);
}

#[tokio::test]
async fn author_delete_cascades_into_links() {
    let (store, registry) = store_and_registry();
    let book_id = seed_book(&store, "Collected Poems").await;

    registry
        .get("author.created")
        .unwrap()
        .handle(json!({ "author_id": 6, "name": "Lugones" }))
        .await
        .unwrap();
    registry
        .get("author_book.linked")
        .unwrap()
        .handle(json!({ "author_id": 6, "book_id": book_id }))
        .await
        .unwrap();

    registry
        .get("author.deleted")
        .unwrap()
        .handle(json!({ "author_id": 6 }))
        .await
        .unwrap();

    assert!(store.cached_author(6).is_none());
    assert!(store.links().is_empty());
}

#[tokio::test]
async fn unlinked_tolerates_absent_rows() {
    let (store, registry) = store_and_registry();
    let book_id = seed_book(&store, "Final Exam").await;

    registry
        .get("author_book.unlinked")
        .unwrap()
        .handle(json!({ "author_id": 8, "book_id": book_id }))
        .await
        .unwrap();

    assert!(store.links().is_empty());
}

#[tokio::test]
async fn missing_required_field_fails_the_handler() {
    let (_store, registry) = store_and_registry();

    let result = registry
        .get("author.created")
        .unwrap()
        .handle(json!({ "name": "No Id" }))
        .await;

    assert!(result.is_err());
}
