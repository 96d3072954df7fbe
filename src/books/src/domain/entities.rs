//! Domain entities for the books service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A book owned by this service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied book fields for create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
}

/// An author replicated from the authors service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CachedAuthor {
    pub author_id: i64,
    pub name: String,
    pub nationality: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// A book together with the cached authors linked to it.
#[derive(Debug, Clone, Serialize)]
pub struct BookWithAuthors {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<CachedAuthor>,
}
