//! Event handlers for topics published by the books service.
//!
//! Each handler deserializes the envelope's `data` payload and delegates to
//! a sync method on an [`AuthorService`] built without a publisher, so
//! replication can never cascade into further events.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use libris_core::events::{EventHandler, HandlerError, HandlerRegistry};
use libris_core::EventError;

use crate::domain::service::AuthorService;
use crate::repository::{AuthorRepository, BookCache};
use crate::topics;

#[derive(Debug, Deserialize)]
struct BookPayload {
    book_id: i64,
    title: String,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BookRef {
    book_id: i64,
}

#[derive(Debug, Deserialize)]
struct LinkPayload {
    author_id: i64,
    book_id: i64,
}

/// `book.created` and `book.updated` both collapse to the same cache upsert.
struct BookUpserted {
    service: Arc<AuthorService>,
}

#[async_trait]
impl EventHandler for BookUpserted {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: BookPayload = serde_json::from_value(data)?;
        self.service
            .sync_book_to_cache(
                payload.book_id,
                &payload.title,
                payload.isbn.as_deref(),
                payload.publication_year,
            )
            .await?;
        Ok(())
    }
}

struct BookDeleted {
    service: Arc<AuthorService>,
}

#[async_trait]
impl EventHandler for BookDeleted {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: BookRef = serde_json::from_value(data)?;
        self.service
            .remove_book_from_cache_and_authors(payload.book_id)
            .await?;
        Ok(())
    }
}

struct BookLinked {
    service: Arc<AuthorService>,
}

#[async_trait]
impl EventHandler for BookLinked {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: LinkPayload = serde_json::from_value(data)?;
        self.service
            .sync_book_linked(payload.author_id, payload.book_id)
            .await?;
        Ok(())
    }
}

struct BookUnlinked {
    service: Arc<AuthorService>,
}

#[async_trait]
impl EventHandler for BookUnlinked {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: LinkPayload = serde_json::from_value(data)?;
        self.service
            .sync_book_unlinked(payload.author_id, payload.book_id)
            .await?;
        Ok(())
    }
}

/// Build the topic table consumed by this service.
pub fn handler_registry(
    repo: Arc<dyn AuthorRepository>,
    cache: Arc<dyn BookCache>,
) -> Result<HandlerRegistry, EventError> {
    let service = Arc::new(AuthorService::without_publisher(repo, cache));

    let mut registry = HandlerRegistry::new();
    registry.register(
        topics::BOOK_CREATED,
        Arc::new(BookUpserted {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::BOOK_UPDATED,
        Arc::new(BookUpserted {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::BOOK_DELETED,
        Arc::new(BookDeleted {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::BOOK_AUTHOR_LINKED,
        Arc::new(BookLinked {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::BOOK_AUTHOR_UNLINKED,
        Arc::new(BookUnlinked { service }),
    )?;

    Ok(registry)
}
