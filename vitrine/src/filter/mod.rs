//! Document predicates.
//!
//! A [Filter] is a small tagged predicate type evaluated by the document store.
//! Filters are composed with the fluent builder returned by [field] and the
//! logical combinators [and], [or] and [not].
//!
//! ```rust,ignore
//! use vitrine::filter::*;
//!
//! let published = field("publish_state").eq("published");
//! let recent = field("created_at").gte(cutoff);
//! let filter = and(vec![published, recent]);
//! ```

#[allow(clippy::module_inception)]
mod filter;
mod fluent;

pub use filter::*;
pub use fluent::*;
