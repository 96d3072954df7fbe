//! Domain service for books.
//!
//! Mirrors the authors service: validate, write, commit, publish, with the
//! publish step fire-and-forget relative to the caller.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use libris_core::events::EventPublisher;
use libris_core::{Result, ServiceError};

use crate::domain::entities::{Book, BookWithAuthors, NewBook};
use crate::repository::{AuthorCache, BookRepository};
use crate::topics;

pub struct BookService {
    repo: Arc<dyn BookRepository>,
    cache: Arc<dyn AuthorCache>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl BookService {
    pub fn new(
        repo: Arc<dyn BookRepository>,
        cache: Arc<dyn AuthorCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repo,
            cache,
            publisher: Some(publisher),
        }
    }

    /// A service instance that never publishes; the event handlers run on
    /// one of these.
    pub fn without_publisher(repo: Arc<dyn BookRepository>, cache: Arc<dyn AuthorCache>) -> Self {
        Self {
            repo,
            cache,
            publisher: None,
        }
    }

    async fn publish(&self, topic: &str, data: Value, correlation_id: Option<&str>) {
        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher
                .publish(topic, data, correlation_id.map(str::to_string))
                .await
            {
                warn!(topic, error = %e, "event publish failed; local write is already committed");
            }
        }
    }

    fn validate(book: &NewBook) -> Result<()> {
        if book.title.trim().is_empty() {
            return Err(ServiceError::validation("book title must not be empty"));
        }
        Ok(())
    }

    pub async fn create_book(&self, book: NewBook, correlation_id: Option<&str>) -> Result<Book> {
        Self::validate(&book)?;

        let created = self.repo.insert(&book).await?;
        self.publish(
            topics::BOOK_CREATED,
            json!({
                "book_id": created.id,
                "title": created.title,
                "isbn": created.isbn,
                "publication_year": created.publication_year,
            }),
            correlation_id,
        )
        .await;

        Ok(created)
    }

    pub async fn get_book_with_authors(&self, book_id: i64) -> Result<Option<BookWithAuthors>> {
        let Some(book) = self.repo.get(book_id).await? else {
            return Ok(None);
        };
        let authors = self.repo.authors_for_book(book_id).await?;
        Ok(Some(BookWithAuthors { book, authors }))
    }

    pub async fn list_books(&self, skip: i64, limit: i64) -> Result<Vec<Book>> {
        self.repo.list(skip, limit).await
    }

    pub async fn update_book(
        &self,
        book_id: i64,
        book: NewBook,
        correlation_id: Option<&str>,
    ) -> Result<Book> {
        Self::validate(&book)?;

        let updated = self
            .repo
            .update(book_id, &book)
            .await?
            .ok_or_else(|| ServiceError::not_found("book", book_id))?;

        self.publish(
            topics::BOOK_UPDATED,
            json!({
                "book_id": updated.id,
                "title": updated.title,
                "isbn": updated.isbn,
                "publication_year": updated.publication_year,
            }),
            correlation_id,
        )
        .await;

        Ok(updated)
    }

    pub async fn delete_book(&self, book_id: i64, correlation_id: Option<&str>) -> Result<()> {
        if !self.repo.delete(book_id).await? {
            return Err(ServiceError::not_found("book", book_id));
        }

        self.publish(
            topics::BOOK_DELETED,
            json!({ "book_id": book_id }),
            correlation_id,
        )
        .await;

        Ok(())
    }

    /// Link authors to a book.
    ///
    /// Every target author must already exist in the local cache; if any is
    /// missing, no links are written and no events are published.
    pub async fn assign_authors(
        &self,
        book_id: i64,
        author_ids: &[i64],
        correlation_id: Option<&str>,
    ) -> Result<()> {
        if self.repo.get(book_id).await?.is_none() {
            return Err(ServiceError::not_found("book", book_id));
        }
        for &author_id in author_ids {
            if self.cache.get(author_id).await?.is_none() {
                return Err(ServiceError::not_found("author", author_id));
            }
        }

        self.repo.add_links(book_id, author_ids).await?;

        for &author_id in author_ids {
            self.publish(
                topics::BOOK_AUTHOR_LINKED,
                json!({ "book_id": book_id, "author_id": author_id }),
                correlation_id,
            )
            .await;
        }

        Ok(())
    }

    /// Remove an author link. Removing an absent link is a success with no
    /// event published.
    pub async fn unassign_author(
        &self,
        book_id: i64,
        author_id: i64,
        correlation_id: Option<&str>,
    ) -> Result<()> {
        if self.repo.get(book_id).await?.is_none() {
            return Err(ServiceError::not_found("book", book_id));
        }

        if self.repo.remove_link(book_id, author_id).await? {
            self.publish(
                topics::BOOK_AUTHOR_UNLINKED,
                json!({ "book_id": book_id, "author_id": author_id }),
                correlation_id,
            )
            .await;
        }

        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Sync methods, called by the event handlers. These never publish.
    // ───────────────────────────────────────────────────────────────────────

    /// Upsert a replicated author into the cache.
    pub async fn sync_author_to_cache(
        &self,
        author_id: i64,
        name: &str,
        nationality: Option<&str>,
    ) -> Result<()> {
        self.cache.upsert(author_id, name, nationality).await
    }

    /// Remove a deleted author from the cache and from every book.
    pub async fn remove_author_from_cache_and_books(&self, author_id: i64) -> Result<()> {
        self.cache.remove(author_id).await
    }

    /// Replicate a link created on the authors service.
    pub async fn sync_author_linked(&self, book_id: i64, author_id: i64) -> Result<()> {
        self.repo.add_links(book_id, &[author_id]).await
    }

    /// Replicate a link removal from the authors service.
    pub async fn sync_author_unlinked(&self, book_id: i64, author_id: i64) -> Result<()> {
        self.repo.remove_link(book_id, author_id).await?;
        Ok(())
    }
}
