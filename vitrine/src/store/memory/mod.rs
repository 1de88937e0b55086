//! In-memory document store, the reference backend for tests and embedding.

mod collection;
mod module;
mod store;

pub use module::*;
pub use store::*;
