//! Bookshelf application library
//!
//! Wires the book catalogue module into the kernel registry and exposes the
//! bootstrap used by both the server binary and the CLI.

pub mod app;
pub mod modules;

pub use modules::books::{BookError, BookService};
