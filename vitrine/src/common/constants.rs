//! Field names shared by every record plus engine-wide defaults.

/// Identity field of every record.
pub const DOC_ID: &str = "_id";
/// Creation timestamp, assigned once on insert.
pub const DOC_CREATED_AT: &str = "created_at";
/// Last update timestamp, refreshed by every update.
pub const DOC_UPDATED_AT: &str = "updated_at";

/// Separator for addressing fields of nested documents (`metadata.origin_address`).
pub const FIELD_SEPARATOR: char = '.';

/// Hard ceiling for page sizes unless the configuration lowers it.
pub const DEFAULT_MAX_PAGE_LIMIT: u64 = 100;
pub const DEFAULT_PAGE_LIMIT: u64 = 20;
/// Sort applied when a caller passes an empty sort string.
pub const DEFAULT_SORT: &str = "-created_at";
pub const DEFAULT_RELATED_LIMIT: u64 = 4;

// Fields shared by the capability traits.
pub const SLUG: &str = "slug";
pub const NAME: &str = "name";
pub const PARENT: &str = "parent";
pub const ORDER: &str = "order";
pub const PUBLISH_STATE: &str = "publish_state";
pub const FIRST_PUBLISHED_AT: &str = "first_published_at";
pub const CATEGORIES: &str = "categories";
pub const PRIMARY_CATEGORY: &str = "primary_category";
pub const TAGS: &str = "tags";
