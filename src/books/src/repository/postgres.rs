//! PostgreSQL store for the books service.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use libris_core::config::DatabaseConfig;
use libris_core::{Result, ServiceError};

use crate::domain::entities::{Book, CachedAuthor, NewBook};
use crate::repository::{AuthorCache, BookRepository};

/// One store implements both repository traits over a shared pool, so the
/// delete cascade (cache row plus links) runs in a single transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ServiceError::from(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BookRepository for PgStore {
    async fn insert(&self, book: &NewBook) -> Result<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, isbn, publication_year)
            VALUES ($1, $2, $3)
            RETURNING id, title, isbn, publication_year, created_at, updated_at
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.publication_year)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get(&self, book_id: i64) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, isbn, publication_year, created_at, updated_at
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, isbn, publication_year, created_at, updated_at
            FROM books
            ORDER BY id
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn update(&self, book_id: i64, book: &NewBook) -> Result<Option<Book>> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $2, isbn = $3, publication_year = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, isbn, publication_year, created_at, updated_at
            "#,
        )
        .bind(book_id)
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.publication_year)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, book_id: i64) -> Result<bool> {
        // link rows go with the book via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_links(&self, book_id: i64, author_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for author_id in author_ids {
            sqlx::query(
                r#"
                INSERT INTO book_authors (book_id, author_id)
                VALUES ($1, $2)
                ON CONFLICT (book_id, author_id) DO NOTHING
                "#,
            )
            .bind(book_id)
            .bind(author_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_link(&self, book_id: i64, author_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM book_authors
            WHERE book_id = $1 AND author_id = $2
            "#,
        )
        .bind(book_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn authors_for_book(&self, book_id: i64) -> Result<Vec<CachedAuthor>> {
        let authors = sqlx::query_as::<_, CachedAuthor>(
            r#"
            SELECT ac.author_id, ac.name, ac.nationality, ac.synced_at
            FROM authors_cache ac
            JOIN book_authors ba ON ba.author_id = ac.author_id
            WHERE ba.book_id = $1
            ORDER BY ac.author_id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(authors)
    }
}

#[async_trait]
impl AuthorCache for PgStore {
    async fn upsert(&self, author_id: i64, name: &str, nationality: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authors_cache (author_id, name, nationality, synced_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (author_id) DO UPDATE
            SET name = EXCLUDED.name,
                nationality = EXCLUDED.nationality,
                synced_at = NOW()
            "#,
        )
        .bind(author_id)
        .bind(name)
        .bind(nationality)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, author_id: i64) -> Result<Option<CachedAuthor>> {
        let author = sqlx::query_as::<_, CachedAuthor>(
            r#"
            SELECT author_id, name, nationality, synced_at
            FROM authors_cache
            WHERE author_id = $1
            "#,
        )
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(author)
    }

    async fn remove(&self, author_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM book_authors WHERE author_id = $1")
            .bind(author_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM authors_cache WHERE author_id = $1")
            .bind(author_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
