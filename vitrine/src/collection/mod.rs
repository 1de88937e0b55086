//! Document-level types exchanged with the document store: documents, record ids,
//! find and update options, updates and write results.

mod document;
mod find_options;
mod record_id;
mod update;
mod update_options;
mod write_result;

pub use document::*;
pub use find_options::*;
pub use record_id::*;
pub use update::*;
pub use update_options::*;
pub use write_result::*;
