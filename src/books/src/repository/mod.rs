//! Persistence contracts for the books service.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use libris_core::Result;

use crate::domain::entities::{Book, CachedAuthor, NewBook};

/// Storage for books and their author links.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: &NewBook) -> Result<Book>;

    async fn get(&self, book_id: i64) -> Result<Option<Book>>;

    /// Page of books ordered by id.
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Book>>;

    async fn update(&self, book_id: i64, book: &NewBook) -> Result<Option<Book>>;

    /// Returns `false` when the book did not exist. Deleting a book also
    /// removes its link rows.
    async fn delete(&self, book_id: i64) -> Result<bool>;

    /// Insert-or-ignore each (book, author) pair.
    async fn add_links(&self, book_id: i64, author_ids: &[i64]) -> Result<()>;

    async fn remove_link(&self, book_id: i64, author_id: i64) -> Result<bool>;

    /// Cached authors currently linked to the book.
    async fn authors_for_book(&self, book_id: i64) -> Result<Vec<CachedAuthor>>;
}

/// The replicated authors cache.
#[async_trait]
pub trait AuthorCache: Send + Sync {
    /// Insert or overwrite the cache row, refreshing `synced_at`.
    async fn upsert(&self, author_id: i64, name: &str, nationality: Option<&str>) -> Result<()>;

    async fn get(&self, author_id: i64) -> Result<Option<CachedAuthor>>;

    /// Remove the cache row and every book link referencing the author, as
    /// one unit of work.
    async fn remove(&self, author_id: i64) -> Result<()>;
}
