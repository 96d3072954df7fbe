//! In-memory store backing the service and handler tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use libris_core::Result;

use crate::domain::entities::{Author, CachedBook, NewAuthor};
use crate::repository::{AuthorRepository, BookCache};

#[derive(Default)]
struct State {
    next_id: i64,
    authors: BTreeMap<i64, Author>,
    links: BTreeSet<(i64, i64)>,
    cache: BTreeMap<i64, CachedBook>,
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

    /// Current (author, book) link pairs, for assertions.
    pub fn links(&self) -> Vec<(i64, i64)> {
        self.state.read().unwrap().links.iter().copied().collect()
    }

    /// Cache row lookup, for assertions.
    pub fn cached_book(&self, book_id: i64) -> Option<CachedBook> {
        self.state.read().unwrap().cache.get(&book_id).cloned()
    }
}

#[async_trait]
impl AuthorRepository for InMemoryStore {
    async fn insert(&self, author: &NewAuthor) -> Result<Author> {
        let mut state = self.state.write().unwrap();
        state.next_id += 1;
        let now = Utc::now();
        let created = Author {
            id: state.next_id,
            name: author.name.clone(),
            birth_date: author.birth_date,
            nationality: author.nationality.clone(),
            created_at: now,
            updated_at: now,
        };
        state.authors.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, author_id: i64) -> Result<Option<Author>> {
        Ok(self.state.read().unwrap().authors.get(&author_id).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Author>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .authors
            .values()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update(&self, author_id: i64, author: &NewAuthor) -> Result<Option<Author>> {
        let mut state = self.state.write().unwrap();
        let Some(existing) = state.authors.get_mut(&author_id) else {
            return Ok(None);
        };
        existing.name = author.name.clone();
        existing.birth_date = author.birth_date;
        existing.nationality = author.nationality.clone();
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, author_id: i64) -> Result<bool> {
        let mut state = self.state.write().unwrap();
        if state.authors.remove(&author_id).is_none() {
            return Ok(false);
        }
        state.links.retain(|&(a, _)| a != author_id);
        Ok(true)
    }

    async fn add_links(&self, author_id: i64, book_ids: &[i64]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        for &book_id in book_ids {
            state.links.insert((author_id, book_id));
        }
        Ok(())
    }

    async fn remove_link(&self, author_id: i64, book_id: i64) -> Result<bool> {
        Ok(self.state.write().unwrap().links.remove(&(author_id, book_id)))
    }

    async fn books_for_author(&self, author_id: i64) -> Result<Vec<CachedBook>> {
        let state = self.state.read().unwrap();
        Ok(state
            .links
            .iter()
            .filter(|&&(a, _)| a == author_id)
            .filter_map(|&(_, b)| state.cache.get(&b).cloned())
            .collect())
    }
}

#[async_trait]
impl BookCache for InMemoryStore {
    async fn upsert(
        &self,
        book_id: i64,
        title: &str,
        isbn: Option<&str>,
        publication_year: Option<i32>,
    ) -> Result<()> {
        self.state.write().unwrap().cache.insert(
            book_id,
            CachedBook {
                book_id,
                title: title.to_string(),
                isbn: isbn.map(str::to_string),
                publication_year,
                synced_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, book_id: i64) -> Result<Option<CachedBook>> {
        Ok(self.state.read().unwrap().cache.get(&book_id).cloned())
    }

    async fn remove(&self, book_id: i64) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.cache.remove(&book_id);
        state.links.retain(|&(_, b)| b != book_id);
        Ok(())
    }
}
