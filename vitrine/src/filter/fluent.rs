use super::{Filter, FilterPattern, RangeBound};
use crate::common::Value;
use crate::errors::VitrineResult;
use regex::RegexBuilder;
use std::ops::Bound;

/// Creates a fluent filter builder for the specified field name.
///
/// Dotted names address nested documents (`metadata.origin_address`).
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

/// A fluent builder for constructing filters on a specific field.
///
/// Each method consumes the builder and returns a [Filter] which can be passed to a
/// repository directly or combined with other filters.
pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    /// Matches documents where the field equals the value.
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Equals {
            field: self.field_name,
            value: value.into(),
        }
    }

    /// Matches documents where the field does not equal the value.
    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::NotEquals {
            field: self.field_name,
            value: value.into(),
        }
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        self.range(Bound::Excluded(value.into()), Bound::Unbounded)
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        self.range(Bound::Included(value.into()), Bound::Unbounded)
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        self.range(Bound::Unbounded, Bound::Excluded(value.into()))
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        self.range(Bound::Unbounded, Bound::Included(value.into()))
    }

    /// Matches documents where the field lies within the inclusive range.
    pub fn between<T: Into<Value>, U: Into<Value>>(self, lower_bound: T, upper_bound: U) -> Filter {
        self.range(
            Bound::Included(lower_bound.into()),
            Bound::Included(upper_bound.into()),
        )
    }

    /// Matches documents where the field lies within arbitrary bounds.
    ///
    /// Both bounds may be [Bound::Unbounded], in which case every non-null value of
    /// the field matches.
    pub fn range(self, lower: Bound<Value>, upper: Bound<Value>) -> Filter {
        Filter::Range {
            field: self.field_name,
            bound: RangeBound::new(lower, upper),
        }
    }

    /// Matches documents where the field value is one of `values`.
    pub fn in_values<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::In {
            field: self.field_name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Matches documents where the field value is none of `values`.
    pub fn not_in<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::NotIn {
            field: self.field_name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Matches documents whose string field matches the regular expression.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidOperation` error when the pattern does not compile.
    pub fn regex(self, pattern: &str) -> VitrineResult<Filter> {
        self.build_regex(pattern, false)
    }

    /// Like [FluentFilter::regex] but ignoring case.
    pub fn regex_case_insensitive(self, pattern: &str) -> VitrineResult<Filter> {
        self.build_regex(pattern, true)
    }

    fn build_regex(self, pattern: &str, case_insensitive: bool) -> VitrineResult<Filter> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| {
                log::error!("Invalid regex pattern {}: {}", pattern, e);
                e
            })?;
        Ok(Filter::Regex {
            field: self.field_name,
            pattern: FilterPattern::new(pattern, regex),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn builds_tagged_variants() {
        assert!(matches!(field("a").eq(1), Filter::Equals { .. }));
        assert!(matches!(field("a").ne(1), Filter::NotEquals { .. }));
        assert!(matches!(field("a").in_values(vec![1, 2]), Filter::In { .. }));
        assert!(matches!(field("a").not_in(vec![1]), Filter::NotIn { .. }));
        assert!(matches!(field("a").between(1, 2), Filter::Range { .. }));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = field("title").regex("(unclosed").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
    }

    #[test]
    fn regex_keeps_source_pattern() {
        match field("title").regex_case_insensitive("a\\.b").unwrap() {
            Filter::Regex { field, pattern } => {
                assert_eq!(field, "title");
                assert_eq!(pattern.pattern(), "a\\.b");
                assert!(pattern.is_match("xA.By"));
            }
            other => panic!("unexpected {}", other),
        }
    }
}
