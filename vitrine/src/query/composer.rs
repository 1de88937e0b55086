use crate::common::Value;
use crate::errors::{VitrineError, VitrineResult};
use crate::filter::{and, field, Filter};
use crate::query::build_search_filter;
use std::ops::Bound;

/// Builds a filter from optional query dimensions.
///
/// Every dimension becomes a predicate only when the caller supplied it, and all
/// predicates are AND-ed. An empty list counts as not supplied. Errors are captured
/// and reported by [FilterComposer::build].
///
/// # Examples
///
/// ```rust,ignore
/// let filter = FilterComposer::new()
///     .search(query.search.as_deref(), &["title", "description"])
///     .eq("publish_state", query.publish_state.map(|s| s.as_str()))
///     .any_of("treatments", query.treatments.clone())
///     .build()?;
/// ```
#[derive(Default)]
pub struct FilterComposer {
    filters: Vec<Filter>,
    error: Option<VitrineError>,
}

impl FilterComposer {
    pub fn new() -> Self {
        FilterComposer {
            filters: Vec::new(),
            error: None,
        }
    }

    /// Starts from a caller-supplied base filter.
    pub fn with_base(base: Filter) -> Self {
        FilterComposer::new().filter(base)
    }

    /// Adds an arbitrary predicate.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// `field == value` when a value is supplied. On array fields this means the
    /// array contains the value.
    pub fn eq<T: Into<Value>>(mut self, name: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.filters.push(field(name).eq(value));
        }
        self
    }

    /// `field` is a member of `values` when a non-empty list is supplied.
    pub fn any_of<T: Into<Value>>(mut self, name: &str, values: Option<Vec<T>>) -> Self {
        if let Some(values) = values {
            if !values.is_empty() {
                self.filters.push(field(name).in_values(values));
            }
        }
        self
    }

    /// Inclusive range on `field`; either end may be left open.
    pub fn range<T: Into<Value>>(mut self, name: &str, from: Option<T>, to: Option<T>) -> Self {
        let lower = from.map(|v| Bound::Included(v.into())).unwrap_or(Bound::Unbounded);
        let upper = to.map(|v| Bound::Included(v.into())).unwrap_or(Bound::Unbounded);
        if !matches!((&lower, &upper), (Bound::Unbounded, Bound::Unbounded)) {
            self.filters.push(field(name).range(lower, upper));
        }
        self
    }

    /// Literal, case-insensitive substring search over `fields`.
    pub fn search(mut self, term: Option<&str>, fields: &[&str]) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Some(term) = term {
            match build_search_filter(term, fields) {
                Ok(Some(filter)) => self.filters.push(filter),
                Ok(None) => {}
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn build(self) -> VitrineResult<Filter> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(and(self.filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn nothing_supplied_matches_all() {
        let filter = FilterComposer::new()
            .eq::<&str>("publish_state", None)
            .any_of::<&str>("tags", Some(vec![]))
            .range::<i64>("order", None, None)
            .search(Some("  "), &["title"])
            .build()
            .unwrap();
        assert!(filter.is_all());
    }

    #[test]
    fn supplied_dimensions_are_anded() {
        let filter = FilterComposer::with_base(field("visibility").eq("public"))
            .eq("publish_state", Some("published"))
            .any_of("treatments", Some(vec!["ipl", "laser"]))
            .range("order", Some(1), Some(5))
            .search(Some("hair"), &["title"])
            .build()
            .unwrap();

        let hit = doc! {
            visibility: "public",
            publish_state: "published",
            treatments: ["laser"],
            order: 3,
            title: "Hair removal",
        };
        assert!(filter.matches(&hit));

        let mut miss = hit.clone();
        miss.put("order", 9).unwrap();
        assert!(!filter.matches(&miss));

        let mut miss = hit.clone();
        miss.put("treatments", vec!["peel"]).unwrap();
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn open_ended_range() {
        let filter = FilterComposer::new()
            .range("order", Some(2), None)
            .build()
            .unwrap();
        assert!(filter.matches(&doc! { order: 10 }));
        assert!(!filter.matches(&doc! { order: 1 }));
    }
}
