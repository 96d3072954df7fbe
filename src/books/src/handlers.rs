//! Event handlers for topics published by the authors service.
//!
//! Handlers delegate to sync methods on a [`BookService`] built without a
//! publisher, so replication can never cascade into further events.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use libris_core::events::{EventHandler, HandlerError, HandlerRegistry};
use libris_core::EventError;

use crate::domain::service::BookService;
use crate::repository::{AuthorCache, BookRepository};
use crate::topics;

#[derive(Debug, Deserialize)]
struct AuthorPayload {
    author_id: i64,
    name: String,
    #[serde(default)]
    nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    author_id: i64,
}

#[derive(Debug, Deserialize)]
struct LinkPayload {
    author_id: i64,
    book_id: i64,
}

/// `author.created` and `author.updated` both collapse to the same upsert.
struct AuthorUpserted {
    service: Arc<BookService>,
}

#[async_trait]
impl EventHandler for AuthorUpserted {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: AuthorPayload = serde_json::from_value(data)?;
        self.service
            .sync_author_to_cache(payload.author_id, &payload.name, payload.nationality.as_deref())
            .await?;
        Ok(())
    }
}

struct AuthorDeleted {
    service: Arc<BookService>,
}

#[async_trait]
impl EventHandler for AuthorDeleted {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: AuthorRef = serde_json::from_value(data)?;
        self.service
            .remove_author_from_cache_and_books(payload.author_id)
            .await?;
        Ok(())
    }
}

struct AuthorLinked {
    service: Arc<BookService>,
}

#[async_trait]
impl EventHandler for AuthorLinked {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: LinkPayload = serde_json::from_value(data)?;
        self.service
            .sync_author_linked(payload.book_id, payload.author_id)
            .await?;
        Ok(())
    }
}

struct AuthorUnlinked {
    service: Arc<BookService>,
}

#[async_trait]
impl EventHandler for AuthorUnlinked {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let payload: LinkPayload = serde_json::from_value(data)?;
        self.service
            .sync_author_unlinked(payload.book_id, payload.author_id)
            .await?;
        Ok(())
    }
}

/// Build the topic table consumed by this service.
pub fn handler_registry(
    repo: Arc<dyn BookRepository>,
    cache: Arc<dyn AuthorCache>,
) -> Result<HandlerRegistry, EventError> {
    let service = Arc::new(BookService::without_publisher(repo, cache));

    let mut registry = HandlerRegistry::new();
    registry.register(
        topics::AUTHOR_CREATED,
        Arc::new(AuthorUpserted {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::AUTHOR_UPDATED,
        Arc::new(AuthorUpserted {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::AUTHOR_DELETED,
        Arc::new(AuthorDeleted {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::AUTHOR_BOOK_LINKED,
        Arc::new(AuthorLinked {
            service: Arc::clone(&service),
        }),
    )?;
    registry.register(
        topics::AUTHOR_BOOK_UNLINKED,
        Arc::new(AuthorUnlinked { service }),
    )?;

    Ok(registry)
}
