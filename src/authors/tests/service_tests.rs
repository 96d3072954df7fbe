//! Domain service behavior over the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use libris_core::events::testing::RecordingPublisher;
use libris_core::events::EventPublisher;
use libris_core::{EventError, ServiceError};

use authors_service::repository::memory::InMemoryStore;
use authors_service::repository::AuthorRepository;
use authors_service::{AuthorService, NewAuthor};

fn new_author(name: &str) -> NewAuthor {
    NewAuthor {
        name: name.to_string(),
        birth_date: None,
        nationality: Some("Argentinian".to_string()),
    }
}

fn service_with_publisher() -> (Arc<InMemoryStore>, Arc<RecordingPublisher>, AuthorService) {
    let store = Arc::new(InMemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let service = AuthorService::new(store.clone(), store.clone(), publisher.clone());
    (store, publisher, service)
}

#[tokio::test]
async fn create_author_persists_and_publishes() {
    let (store, publisher, service) = service_with_publisher();

    let created = service
        .create_author(new_author("Jorge Luis Borges"), Some("req-1"))
        .await
        .unwrap();

    assert!(store.get(created.id).await.unwrap().is_some());

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].topic, "author.created");
    assert_eq!(events[0].data["author_id"], created.id);
    assert_eq!(events[0].data["name"], "Jorge Luis Borges");
    assert_eq!(events[0].correlation_id.as_deref(), Some("req-1"));
}

#[tokio::test]
async fn short_name_is_rejected_without_side_effects() {
    let (store, publisher, service) = service_with_publisher();

    let err = service.create_author(new_author(" x "), None).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert!(store.list(0, 10).await.unwrap().is_empty());
    assert!(publisher.is_empty());
}

#[tokio::test]
async fn update_missing_author_is_not_found() {
    let (_store, publisher, service) = service_with_publisher();

    let err = service
        .update_author(99, new_author("Updated Name"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "author", id: 99 }));
    assert!(publisher.is_empty());
}

#[tokio::test]
async fn delete_author_publishes_deleted_event() {
    let (_store, publisher, service) = service_with_publisher();

    let created = service.create_author(new_author("Julio Cortazar"), None).await.unwrap();
    service.delete_author(created.id, None).await.unwrap();

    assert_eq!(publisher.topics(), vec!["author.created", "author.deleted"]);

    let err = service.delete_author(created.id, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn assign_links_and_publishes_one_event_per_book() {
    let (store, publisher, service) = service_with_publisher();

    let author = service.create_author(new_author("Adolfo Bioy Casares"), None).await.unwrap();
    service.sync_book_to_cache(1, "The Invention of Morel", None, Some(1940)).await.unwrap();
    service.sync_book_to_cache(2, "Asleep in the Sun", None, Some(1973)).await.unwrap();

    service.assign_books(author.id, &[1, 2], Some("req-7")).await.unwrap();

    assert_eq!(store.links(), vec![(author.id, 1), (author.id, 2)]);
    let linked: Vec<_> = publisher
        .events()
        .into_iter()
        .filter(|e| e.topic == "author_book.linked")
        .collect();
    assert_eq!(linked.len(), 2);
    assert_eq!(linked[0].data["book_id"], 1);
    assert_eq!(linked[1].data["book_id"], 2);
}

#[tokio::test]
async fn assign_with_uncached_book_writes_nothing() {
    let (store, publisher, service) = service_with_publisher();

    let author = service.create_author(new_author("Silvina Ocampo"), None).await.unwrap();
    service.sync_book_to_cache(1, "Cuentos", None, None).await.unwrap();

    // book 2 was never replicated into the cache
    let err = service.assign_books(author.id, &[1, 2], None).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "book", id: 2 }));

    assert!(store.links().is_empty());
    assert_eq!(publisher.topics(), vec!["author.created"]);
}

#[tokio::test]
async fn unassign_absent_link_succeeds_silently() {
    let (_store, publisher, service) = service_with_publisher();

    let author = service.create_author(new_author("Alejandra Pizarnik"), None).await.unwrap();
    service.unassign_book(author.id, 42, None).await.unwrap();

    assert_eq!(publisher.topics(), vec!["author.created"]);
}

#[tokio::test]
async fn publish_failure_does_not_fail_the_write() {
    let (store, publisher, service) = service_with_publisher();

    publisher.fail_next(1);
    let created = service.create_author(new_author("Ricardo Piglia"), None).await.unwrap();

    // the author is committed even though the event was lost
    assert!(store.get(created.id).await.unwrap().is_some());
    assert!(publisher.is_empty());
}

#[tokio::test]
async fn sync_methods_never_publish() {
    let (store, publisher, service) = service_with_publisher();

    let author = service.create_author(new_author("Cesar Aira"), None).await.unwrap();
    let publishes_before = publisher.events().len();

    service.sync_book_to_cache(9, "Ghosts", None, Some(1990)).await.unwrap();
    service.sync_book_linked(author.id, 9).await.unwrap();
    service.sync_book_unlinked(author.id, 9).await.unwrap();
    service.remove_book_from_cache_and_authors(9).await.unwrap();

    assert_eq!(publisher.events().len(), publishes_before);
    assert!(store.links().is_empty());
}

#[tokio::test]
async fn book_delete_cascades_links_and_cache() {
    let (store, _publisher, service) = service_with_publisher();

    let author = service.create_author(new_author("Juan Jose Saer"), None).await.unwrap();
    service.sync_book_to_cache(5, "The Witness", None, Some(1983)).await.unwrap();
    service.sync_book_linked(author.id, 5).await.unwrap();

    service.remove_book_from_cache_and_authors(5).await.unwrap();

    assert!(store.links().is_empty());
    let with_books = service.get_author_with_books(author.id).await.unwrap().unwrap();
    assert!(with_books.books.is_empty());
}

/// Publisher that checks the repository already holds the entity when the
/// corresponding event is published.
struct CommitOrderPublisher {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl EventPublisher for CommitOrderPublisher {
    async fn publish(
        &self,
        topic: &str,
        data: Value,
        _correlation_id: Option<String>,
    ) -> Result<(), EventError> {
        if topic == "author.created" {
            let id = data["author_id"].as_i64().unwrap();
            assert!(
                self.store.get(id).await.unwrap().is_some(),
                "author.created published before the write was committed"
            );
        }
        Ok(())
    }
}

#[tokio::test]
async fn events_are_published_after_the_commit() {
    let store = Arc::new(InMemoryStore::new());
    let publisher = Arc::new(CommitOrderPublisher { store: store.clone() });
    let service = AuthorService::new(store.clone(), store, publisher);

    service.create_author(new_author("Victoria Ocampo"), None).await.unwrap();
}

#[tokio::test]
async fn list_authors_pages_by_skip_and_limit() {
    let (_store, _publisher, service) = service_with_publisher();

    for i in 0..5 {
        service
            .create_author(new_author(&format!("Author {i}")), None)
            .await
            .unwrap();
    }

    let page = service.list_authors(1, 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "Author 1");
    assert_eq!(page[1].name, "Author 2");
}

#[tokio::test]
async fn get_author_with_books_resolves_cached_titles() {
    let (_store, _publisher, service) = service_with_publisher();

    let author = service.create_author(new_author("Leopoldo Lugones"), None).await.unwrap();
    service.sync_book_to_cache(3, "Strange Forces", Some("978-0"), Some(1906)).await.unwrap();
    service.assign_books(author.id, &[3], None).await.unwrap();

    let with_books = service.get_author_with_books(author.id).await.unwrap().unwrap();
    assert_eq!(with_books.books.len(), 1);
    assert_eq!(with_books.books[0].title, "Strange Forces");

    assert!(service.get_author_with_books(999).await.unwrap().is_none());

    let _ = json!(with_books); // serializes with flattened author fields
}
