//! Typed repositories over the document store.

mod capability;
mod entity;
mod id;
mod observer;
#[allow(clippy::module_inception)]
mod repository;
mod schema;

pub use capability::*;
pub use entity::Entity;
pub(crate) use entity::{expect_document, from_document, put_optional, to_document};
pub use id::*;
pub use observer::*;
pub use repository::*;
pub use schema::*;
