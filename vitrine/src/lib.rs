//! # Vitrine - Storefront and Blog Persistence Engine
//!
//! Vitrine is the persistence layer of a small storefront with a blog. It sits on a
//! document store and gives product, article, taxonomy and inbox code a single,
//! validated and observable way to read and write records.
//!
//! ## Key Features
//!
//! - **Generic Repository**: typed CRUD, pagination, counts and batched writes for any [`repository::Entity`]
//! - **Query Pipeline**: sort parsing, literal text search and optional-filter composition
//! - **Tree Engine**: nested hierarchies, breadcrumbs, cycle rejection and reparenting
//! - **Cascading Cleanup**: references to a deleted record are pulled or unset everywhere
//! - **Specialized Repositories**: products, articles, categories, blog categories and submissions
//! - **Observability**: per-operation timing, structured logging and a pluggable observer
//! - **Pluggable Stores**: an in-memory reference store behind an async provider trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vitrine::connection::Connection;
//! use vitrine::entities::{Category, CategoryRepository, Product, ProductRepository};
//!
//! # async fn run() -> vitrine::errors::VitrineResult<()> {
//! let connection = Connection::in_memory();
//! let categories = CategoryRepository::new(connection.clone());
//! let products = ProductRepository::new(connection.clone());
//!
//! let lasers = categories.create(Category::new("Lasers", "lasers")).await?;
//! let product = products
//!     .create(Product::new("Diode 808", "diode-808").with_categories(vec![lasers.id.unwrap()]))
//!     .await?;
//!
//! let page = products.by_category(&lasers, 1, None).await?;
//! assert_eq!(page.total, 0); // drafts are not listed
//!
//! connection.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`errors`] - Error kinds and result alias
//! - [`common`] - Values, conversions, sort orders and field names
//! - [`collection`] - Documents, record ids, updates and write results
//! - [`filter`] - Document predicates
//! - [`store`] - Document store abstraction, metrics and the in-memory store
//! - [`config`] - Engine configuration
//! - [`connection`] - Lazily opened, shared store connection
//! - [`query`] - Sorting, searching, filter composition and pagination
//! - [`repository`] - The generic repository, schemas and capability traits
//! - [`tree`] - Hierarchy building and tree operations
//! - [`cascade`] - Reference cleanup after deletes
//! - [`entities`] - Concrete entities and their repositories

pub mod cascade;
pub mod collection;
pub mod common;
pub mod config;
pub mod connection;
pub mod entities;
pub mod errors;
pub mod filter;
pub mod query;
pub mod repository;
pub mod store;
pub mod tree;

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    colog::init();
}
