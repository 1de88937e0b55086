use crate::common::{SortOrder, SortableFields};

/// Options for controlling find operations on documents.
///
/// `FindOptions` specifies sorting and skip/limit windows for query results. It
/// supports method chaining.
///
/// # Examples
///
/// ```rust,ignore
/// use vitrine::collection::FindOptions;
/// use vitrine::common::SortOrder;
///
/// let options = FindOptions::new()
///     .sort_by("created_at", SortOrder::Descending)
///     .skip(10)
///     .limit(20);
///
/// let options = order_by("name", SortOrder::Ascending);
/// let options = limit_to(4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub(crate) sort_by: Option<SortableFields>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
}

/// Creates `FindOptions` with sorting by a field.
pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

/// Creates `FindOptions` that skips a number of results.
pub fn skip_by(skip: u64) -> FindOptions {
    FindOptions::new().skip(skip)
}

/// Creates `FindOptions` that limits the number of results.
pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions {
            sort_by: None,
            skip: None,
            limit: None,
        }
    }

    /// Sets the number of documents to skip from the beginning.
    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Appends a sort key.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        let fields = self.sort_by.unwrap_or_default();
        self.sort_by = Some(fields.add_sorted_field(field_name, sort_order));
        self
    }

    /// Replaces the sort with an already composed multi-key sort.
    pub fn sort(mut self, fields: SortableFields) -> FindOptions {
        self.sort_by = if fields.is_empty() { None } else { Some(fields) };
        self
    }

    pub fn sorting(&self) -> Option<&SortableFields> {
        self.sort_by.as_ref()
    }

    pub fn skip_count(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit_count(&self) -> Option<u64> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by() {
        let options = order_by("name", SortOrder::Ascending);
        let fields = options.sorting().unwrap();
        assert_eq!(fields.sorting_order().len(), 1);
        assert_eq!(fields.sorting_order()[0].0, "name");
    }

    #[test]
    fn test_chained_options() {
        let options = FindOptions::new()
            .sort_by("order", SortOrder::Ascending)
            .sort_by("name", SortOrder::Ascending)
            .skip(20)
            .limit(10);
        assert_eq!(options.sorting().unwrap().sorting_order().len(), 2);
        assert_eq!(options.skip_count(), Some(20));
        assert_eq!(options.limit_count(), Some(10));
    }

    #[test]
    fn test_empty_sort_clears() {
        let options = limit_to(3).sort(SortableFields::new());
        assert!(options.sorting().is_none());
        assert_eq!(skip_by(2).skip_count(), Some(2));
    }
}
