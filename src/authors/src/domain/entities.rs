//! Domain entities for the authors service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An author owned by this service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied author fields for create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuthor {
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
}

/// A book replicated from the books service.
///
/// `synced_at` records when the cache row last absorbed a `book.created` or
/// `book.updated` event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CachedBook {
    pub book_id: i64,
    pub title: String,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub synced_at: DateTime<Utc>,
}

/// An author together with the cached books linked to them.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorWithBooks {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<CachedBook>,
}
