//! Query pipeline: sort parsing, literal search, filter composition and pagination.

mod composer;
mod pagination;
mod search;
mod sort;

pub use composer::*;
pub use pagination::*;
pub use search::*;
pub use sort::*;
