//! PostgreSQL store for the authors service.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use libris_core::config::DatabaseConfig;
use libris_core::{Result, ServiceError};

use crate::domain::entities::{Author, CachedBook, NewAuthor};
use crate::repository::{AuthorRepository, BookCache};

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

    /// Open a connection pool per the service configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations.
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
impl AuthorRepository for PgStore {
    async fn insert(&self, author: &NewAuthor) -> Result<Author> {
        let created = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (name, birth_date, nationality)
            VALUES ($1, $2, $3)
            RETURNING id, name, birth_date, nationality, created_at, updated_at
            "#,
        )
        .bind(&author.name)
        .bind(author.birth_date)
        .bind(&author.nationality)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get(&self, author_id: i64) -> Result<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, name, birth_date, nationality, created_at, updated_at
            FROM authors
            WHERE id = $1
            "#,
        )
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(author)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, name, birth_date, nationality, created_at, updated_at
            FROM authors
            ORDER BY id
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(authors)
    }

    async fn update(&self, author_id: i64, author: &NewAuthor) -> Result<Option<Author>> {
        let updated = sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET name = $2, birth_date = $3, nationality = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, birth_date, nationality, created_at, updated_at
            "#,
        )
        .bind(author_id)
        .bind(&author.name)
        .bind(author.birth_date)
        .bind(&author.nationality)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, author_id: i64) -> Result<bool> {
        // link rows go with the author via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_links(&self, author_id: i64, book_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for book_id in book_ids {
            sqlx::query(
                r#"
                INSERT INTO author_books (author_id, book_id)
                VALUES ($1, $2)
                ON CONFLICT (author_id, book_id) DO NOTHING
                "#,
            )
            .bind(author_id)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_link(&self, author_id: i64, book_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM author_books
            WHERE author_id = $1 AND book_id = $2
            "#,
        )
        .bind(author_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn books_for_author(&self, author_id: i64) -> Result<Vec<CachedBook>> {
        let books = sqlx::query_as::<_, CachedBook>(
            r#"
            SELECT bc.book_id, bc.title, bc.isbn, bc.publication_year, bc.synced_at
            FROM books_cache bc
            JOIN author_books ab ON ab.book_id = bc.book_id
            WHERE ab.author_id = $1
            ORDER BY bc.book_id
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}

#[async_trait]
impl BookCache for PgStore {
    async fn upsert(
        &self,
        book_id: i64,
        title: &str,
        isbn: Option<&str>,
        publication_year: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books_cache (book_id, title, isbn, publication_year, synced_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (book_id) DO UPDATE
            SET title = EXCLUDED.title,
                isbn = EXCLUDED.isbn,
                publication_year = EXCLUDED.publication_year,
                synced_at = NOW()
            "#,
        )
        .bind(book_id)
        .bind(title)
        .bind(isbn)
        .bind(publication_year)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, book_id: i64) -> Result<Option<CachedBook>> {
        let book = sqlx::query_as::<_, CachedBook>(
            r#"
            SELECT book_id, title, isbn, publication_year, synced_at
            FROM books_cache
            WHERE book_id = $1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn remove(&self, book_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM author_books WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM books_cache WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
