//! Persistence contracts for the authors service.
//!
//! The domain service works only against these traits; [`postgres::PgStore`]
//! is the production implementation and [`memory::InMemoryStore`] backs the
//! tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use libris_core::Result;

use crate::domain::entities::{Author, CachedBook, NewAuthor};

/// Storage for authors and their book links.
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn insert(&self, author: &NewAuthor) -> Result<Author>;

    async fn get(&self, author_id: i64) -> Result<Option<Author>>;

    /// Page of authors ordered by id.
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Author>>;

    /// Returns `None` when the author does not exist.
    async fn update(&self, author_id: i64, author: &NewAuthor) -> Result<Option<Author>>;

    /// Returns `false` when the author did not exist. Deleting an author
    /// also removes their link rows.
    async fn delete(&self, author_id: i64) -> Result<bool>;

    /// Insert-or-ignore each (author, book) pair.
    async fn add_links(&self, author_id: i64, book_ids: &[i64]) -> Result<()>;

    /// Delete the link if present; `false` means there was nothing to delete.
    async fn remove_link(&self, author_id: i64, book_id: i64) -> Result<bool>;

    /// Cached books currently linked to the author.
    async fn books_for_author(&self, author_id: i64) -> Result<Vec<CachedBook>>;
}

/// The replicated books cache.
#[async_trait]
pub trait BookCache: Send + Sync {
    /// Insert or overwrite the cache row, refreshing `synced_at`.
    async fn upsert(
        &self,
        book_id: i64,
        title: &str,
        isbn: Option<&str>,
        publication_year: Option<i32>,
    ) -> Result<()>;

    async fn get(&self, book_id: i64) -> Result<Option<CachedBook>>;

    /// Remove the cache row and every author link referencing the book, as
    /// one unit of work. Removing an uncached book is a no-op.
    async fn remove(&self, book_id: i64) -> Result<()>;
}
