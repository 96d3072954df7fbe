//! # Books Service
//!
//! Owns the `Book` entity and the book-author relationship rows, and keeps a
//! local, eventually-consistent cache of authors replicated from the authors
//! service via domain events.
//!
//! Publishes `book.created` / `book.updated` / `book.deleted` and
//! `book_author.linked` / `book_author.unlinked`; consumes the symmetric
//! `author.*` and `author_book.*` topics.

pub mod domain;
pub mod handlers;
pub mod http;
pub mod repository;
pub mod topics;

pub use domain::entities::{Book, BookWithAuthors, CachedAuthor, NewBook};
pub use domain::service::BookService;
pub use handlers::handler_registry;
pub use repository::{AuthorCache, BookRepository};
