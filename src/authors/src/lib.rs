//! # Authors Service
//!
//! Owns the `Author` entity and the author-book relationship rows, and keeps
//! a local, eventually-consistent cache of books replicated from the books
//! service via domain events.
//!
//! Publishes `author.created` / `author.updated` / `author.deleted` and
//! `author_book.linked` / `author_book.unlinked`; consumes the symmetric
//! `book.*` and `book_author.*` topics.

pub mod domain;
pub mod handlers;
pub mod http;
pub mod repository;
pub mod topics;

pub use domain::entities::{Author, AuthorWithBooks, CachedBook, NewAuthor};
pub use domain::service::AuthorService;
pub use handlers::handler_registry;
pub use repository::{AuthorRepository, BookCache};
