//! Topic names for the authors service.
//!
//! The published and consumed sets are disjoint: this service never
//! subscribes to its own events.

// Published
pub const AUTHOR_CREATED: &str = "author.created";
pub const AUTHOR_UPDATED: &str = "author.updated";
pub const AUTHOR_DELETED: &str = "author.deleted";
pub const AUTHOR_BOOK_LINKED: &str = "author_book.linked";
pub const AUTHOR_BOOK_UNLINKED: &str = "author_book.unlinked";

// Consumed (published by the books service)
pub const BOOK_CREATED: &str = "book.created";
pub const BOOK_UPDATED: &str = "book.updated";
pub const BOOK_DELETED: &str = "book.deleted";
pub const BOOK_AUTHOR_LINKED: &str = "book_author.linked";
pub const BOOK_AUTHOR_UNLINKED: &str = "book_author.unlinked";
