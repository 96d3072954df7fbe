//! Domain service for authors.
//!
//! Every mutating operation follows validate, write, commit, publish, in
//! that order. The publish step is fire-and-forget relative to the caller:
//! a broker failure is logged but never rolls back the committed write.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use libris_core::events::EventPublisher;
use libris_core::{Result, ServiceError};

use crate::domain::entities::{Author, AuthorWithBooks, NewAuthor};
use crate::repository::{AuthorRepository, BookCache};
use crate::topics;

pub struct AuthorService {
    repo: Arc<dyn AuthorRepository>,
    cache: Arc<dyn BookCache>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl AuthorService {
    pub fn new(
        repo: Arc<dyn AuthorRepository>,
        cache: Arc<dyn BookCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repo,
            cache,
            publisher: Some(publisher),
        }
    }

    /// A service instance that never publishes. The event handlers run on
    /// one of these so that processing an incoming event cannot emit
    /// outgoing events.
    pub fn without_publisher(repo: Arc<dyn AuthorRepository>, cache: Arc<dyn BookCache>) -> Self {
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

    fn validate(author: &NewAuthor) -> Result<()> {
        if author.name.trim().len() < 2 {
            return Err(ServiceError::validation(
                "author name must be at least 2 characters",
            ));
        }
        Ok(())
    }

    pub async fn create_author(
        &self,
        author: NewAuthor,
        correlation_id: Option<&str>,
    ) -> Result<Author> {
        Self::validate(&author)?;

        let created = self.repo.insert(&author).await?;
        self.publish(
            topics::AUTHOR_CREATED,
            json!({
                "author_id": created.id,
                "name": created.name,
                "birth_date": created.birth_date,
                "nationality": created.nationality,
            }),
            correlation_id,
        )
        .await;

        Ok(created)
    }

    pub async fn get_author_with_books(&self, author_id: i64) -> Result<Option<AuthorWithBooks>> {
        let Some(author) = self.repo.get(author_id).await? else {
            return Ok(None);
        };
        let books = self.repo.books_for_author(author_id).await?;
        Ok(Some(AuthorWithBooks { author, books }))
    }

    pub async fn list_authors(&self, skip: i64, limit: i64) -> Result<Vec<Author>> {
        self.repo.list(skip, limit).await
    }

    pub async fn update_author(
        &self,
        author_id: i64,
        author: NewAuthor,
        correlation_id: Option<&str>,
    ) -> Result<Author> {
        Self::validate(&author)?;

        let updated = self
            .repo
            .update(author_id, &author)
            .await?
            .ok_or_else(|| ServiceError::not_found("author", author_id))?;

        self.publish(
            topics::AUTHOR_UPDATED,
            json!({
                "author_id": updated.id,
                "name": updated.name,
                "birth_date": updated.birth_date,
                "nationality": updated.nationality,
            }),
            correlation_id,
        )
        .await;

        Ok(updated)
    }

    pub async fn delete_author(&self, author_id: i64, correlation_id: Option<&str>) -> Result<()> {
        if !self.repo.delete(author_id).await? {
            return Err(ServiceError::not_found("author", author_id));
        }

        self.publish(
            topics::AUTHOR_DELETED,
            json!({ "author_id": author_id }),
            correlation_id,
        )
        .await;

        Ok(())
    }

    /// Link books to an author.
    ///
    /// Every target book must already exist in the local cache; if any is
    /// missing, no links are written and no events are published.
    pub async fn assign_books(
        &self,
        author_id: i64,
        book_ids: &[i64],
        correlation_id: Option<&str>,
    ) -> Result<()> {
        if self.repo.get(author_id).await?.is_none() {
            return Err(ServiceError::not_found("author", author_id));
        }
        for &book_id in book_ids {
            if self.cache.get(book_id).await?.is_none() {
                return Err(ServiceError::not_found("book", book_id));
            }
        }

        self.repo.add_links(author_id, book_ids).await?;

        for &book_id in book_ids {
            self.publish(
                topics::AUTHOR_BOOK_LINKED,
                json!({ "author_id": author_id, "book_id": book_id }),
                correlation_id,
            )
            .await;
        }

        Ok(())
    }

    /// Remove a book link. Removing an absent link is a success with no
    /// event published.
    pub async fn unassign_book(
        &self,
        author_id: i64,
        book_id: i64,
        correlation_id: Option<&str>,
    ) -> Result<()> {
        if self.repo.get(author_id).await?.is_none() {
            return Err(ServiceError::not_found("author", author_id));
        }

        if self.repo.remove_link(author_id, book_id).await? {
            self.publish(
                topics::AUTHOR_BOOK_UNLINKED,
                json!({ "author_id": author_id, "book_id": book_id }),
                correlation_id,
            )
            .await;
        }

        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Sync methods, called by the event handlers. These never publish,
    // regardless of whether the instance carries a publisher.
    // ───────────────────────────────────────────────────────────────────────

    /// Upsert a replicated book into the cache.
    pub async fn sync_book_to_cache(
        &self,
        book_id: i64,
        title: &str,
        isbn: Option<&str>,
        publication_year: Option<i32>,
    ) -> Result<()> {
        self.cache.upsert(book_id, title, isbn, publication_year).await
    }

    /// Remove a deleted book from the cache and from every author.
    pub async fn remove_book_from_cache_and_authors(&self, book_id: i64) -> Result<()> {
        self.cache.remove(book_id).await
    }

    /// Replicate a link created on the books service.
    pub async fn sync_book_linked(&self, author_id: i64, book_id: i64) -> Result<()> {
        self.repo.add_links(author_id, &[book_id]).await
    }

    /// Replicate a link removal from the books service.
    pub async fn sync_book_unlinked(&self, author_id: i64, book_id: i64) -> Result<()> {
        self.repo.remove_link(author_id, book_id).await?;
        Ok(())
    }
}
