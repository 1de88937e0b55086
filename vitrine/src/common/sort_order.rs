/// Specifies the direction for sorting documents.
///
/// # Variants
/// - `Ascending`: smallest to largest (A to Z, oldest to newest)
/// - `Descending`: largest to smallest (Z to A, newest to oldest)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in ascending order
    Ascending,
    /// Sort in descending order
    Descending,
}

/// An ordered list of `(field, direction)` pairs forming one multi-key sort.
///
/// Keys are applied left to right: the second key only breaks ties of the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortableFields {
    sorting_order: Vec<(String, SortOrder)>,
}

impl SortableFields {
    pub fn new() -> SortableFields {
        SortableFields {
            sorting_order: Vec::new(),
        }
    }

    #[inline]
    pub fn add_field(self, field_name: &str) -> SortableFields {
        self.add_sorted_field(field_name, SortOrder::Ascending)
    }

    #[inline]
    pub fn add_sorted_field(mut self, field_name: &str, sort_order: SortOrder) -> SortableFields {
        self.sorting_order.push((field_name.to_string(), sort_order));
        self
    }

    #[inline]
    pub fn sorting_order(&self) -> &[(String, SortOrder)] {
        &self.sorting_order
    }

    pub fn field_names(&self) -> Vec<String> {
        self.sorting_order.iter().map(|(f, _)| f.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sorting_order.is_empty()
    }
}
