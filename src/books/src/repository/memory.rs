//! In-memory store backing the service and handler tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use libris_core::Result;

use crate::domain::entities::{Book, CachedAuthor, NewBook};
use crate::repository::{AuthorCache, BookRepository};

#[derive(Default)]
struct State {
    next_id: i64,
    books: BTreeMap<i64, Book>,
    links: BTreeSet<(i64, i64)>,
    cache: BTreeMap<i64, CachedAuthor>,
}

/// Lock-per-call store; the lock is never held across an await.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current (book, author) link pairs, for assertions.
    pub fn links(&self) -> Vec<(i64, i64)> {
        self.state.read().unwrap().links.iter().copied().collect()
    }

    /// Cache row lookup, for assertions.
    pub fn cached_author(&self, author_id: i64) -> Option<CachedAuthor> {
        self.state.read().unwrap().cache.get(&author_id).cloned()
    }
}

#[async_trait]
impl BookRepository for InMemoryStore {
    async fn insert(&self, book: &NewBook) -> Result<Book> {
        let mut state = self.state.write().unwrap();
        state.next_id += 1;
        let now = Utc::now();
        let created = Book {
            id: state.next_id,
            title: book.title.clone(),
            isbn: book.isbn.clone(),
            publication_year: book.publication_year,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, book_id: i64) -> Result<Option<Book>> {
        Ok(self.state.read().unwrap().books.get(&book_id).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Book>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .books
            .values()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update(&self, book_id: i64, book: &NewBook) -> Result<Option<Book>> {
        let mut state = self.state.write().unwrap();
        let Some(existing) = state.books.get_mut(&book_id) else {
            return Ok(None);
        };
        existing.title = book.title.clone();
        existing.isbn = book.isbn.clone();
        existing.publication_year = book.publication_year;
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, book_id: i64) -> Result<bool> {
        let mut state = self.state.write().unwrap();
        if state.books.remove(&book_id).is_none() {
            return Ok(false);
        }
        state.links.retain(|&(b, _)| b != book_id);
        Ok(true)
    }

    async fn add_links(&self, book_id: i64, author_ids: &[i64]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        for &author_id in author_ids {
            state.links.insert((book_id, author_id));
        }
        Ok(())
    }

    async fn remove_link(&self, book_id: i64, author_id: i64) -> Result<bool> {
        Ok(self.state.write().unwrap().links.remove(&(book_id, author_id)))
    }

    async fn authors_for_book(&self, book_id: i64) -> Result<Vec<CachedAuthor>> {
        let state = self.state.read().unwrap();
        Ok(state
            .links
            .iter()
            .filter(|&&(b, _)| b == book_id)
            .filter_map(|&(_, a)| state.cache.get(&a).cloned())
            .collect())
    }
}

#[async_trait]
impl AuthorCache for InMemoryStore {
    async fn upsert(&self, author_id: i64, name: &str, nationality: Option<&str>) -> Result<()> {
        self.state.write().unwrap().cache.insert(
            author_id,
            CachedAuthor {
                author_id,
                name: name.to_string(),
                nationality: nationality.map(str::to_string),
                synced_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, author_id: i64) -> Result<Option<CachedAuthor>> {
        Ok(self.state.read().unwrap().cache.get(&author_id).cloned())
    }

    async fn remove(&self, author_id: i64) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.cache.remove(&author_id);
        state.links.retain(|&(_, a)| a != author_id);
        Ok(())
    }
}
