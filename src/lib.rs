//! Bookstore catalog service.
//!
//! Wires the document store, the books module and the HTTP server together.

pub mod app;
pub mod modules;
pub mod utils;

pub use app::{build_registry, run};
