use crate::collection::{Document, RecordId};
use crate::common::{Value, DOC_ID};
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::mem::discriminant;
use std::ops::Bound;

/// A compiled regular expression together with the source pattern it came from.
#[derive(Debug, Clone)]
pub struct FilterPattern {
    pattern: String,
    regex: Regex,
}

impl FilterPattern {
    pub(crate) fn new(pattern: &str, regex: Regex) -> Self {
        FilterPattern {
            pattern: pattern.to_string(),
            regex,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Lower and upper bounds of a [Filter::Range] predicate.
#[derive(Debug, Clone)]
pub struct RangeBound {
    pub(crate) lower: Bound<Value>,
    pub(crate) upper: Bound<Value>,
}

impl RangeBound {
    pub fn new(lower: Bound<Value>, upper: Bound<Value>) -> Self {
        RangeBound { lower, upper }
    }

    pub fn lower(&self) -> &Bound<Value> {
        &self.lower
    }

    pub fn upper(&self) -> &Bound<Value> {
        &self.upper
    }

    fn contains(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        let above = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(low) => comparable(value, low) && value >= low,
            Bound::Excluded(low) => comparable(value, low) && value > low,
        };
        let below = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(high) => comparable(value, high) && value <= high,
            Bound::Excluded(high) => comparable(value, high) && value < high,
        };
        above && below
    }
}

/// A predicate over documents.
///
/// Filters are plain data. They are built through the fluent API in
/// [crate::filter::field] and the combinators [and], [or] and [not], and are
/// evaluated by the document store with [Filter::matches].
///
/// Field predicates follow document-store semantics for arrays: an `Equals`, `In`,
/// `Regex` or `Range` predicate on an array field matches when any element matches.
/// A missing field reads as [Value::Null].
///
/// # Examples
///
/// ```rust,ignore
/// use vitrine::filter::*;
///
/// let filter = field("publish_state").eq("published")
///     .and(field("tags").in_values(vec!["ipl", "hair"]));
/// ```
#[derive(Debug, Clone, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    /// The field value (or any element of an array field) is a member of `values`.
    In { field: String, values: Vec<Value> },
    NotIn { field: String, values: Vec<Value> },
    /// The string field value matches the pattern.
    Regex { field: String, pattern: FilterPattern },
    Range { field: String, bound: RangeBound },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Evaluates the predicate against a document.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Equals { field, value } => any_element(&document.get(field), |v| v == value),
            Filter::NotEquals { field, value } => !any_element(&document.get(field), |v| v == value),
            Filter::In { field, values } => {
                any_element(&document.get(field), |v| values.contains(v))
            }
            Filter::NotIn { field, values } => {
                !any_element(&document.get(field), |v| values.contains(v))
            }
            Filter::Regex { field, pattern } => any_element(&document.get(field), |v| match v {
                Value::String(text) => pattern.is_match(text),
                _ => false,
            }),
            Filter::Range { field, bound } => {
                any_element(&document.get(field), |v| bound.contains(v))
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Filter::Not(filter) => !filter.matches(document),
        }
    }

    /// Combines this filter with another using logical AND.
    ///
    /// `All` operands are dropped and nested `And`s are flattened.
    pub fn and(self, filter: Filter) -> Filter {
        and(vec![self, filter])
    }

    /// Combines this filter with another using logical OR.
    pub fn or(self, filter: Filter) -> Filter {
        or(vec![self, filter])
    }

    /// Negates this filter.
    pub fn not(self) -> Filter {
        not(self)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }
}

/// Applies `predicate` to a scalar value, or to every element of an array value.
///
/// An array also matches when the predicate holds for the array as a whole, so an
/// `Equals` against a full array value keeps working.
fn any_element(value: &Value, predicate: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => predicate(value) || items.iter().any(&predicate),
        _ => predicate(value),
    }
}

/// Range predicates only compare values of the same kind; numbers compare across
/// integer and float.
fn comparable(a: &Value, b: &Value) -> bool {
    (a.is_number() && b.is_number()) || (!a.is_null() && discriminant(a) == discriminant(b))
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "AllFilter"),
            Filter::Equals { field, value } => write!(f, "({} == {:?})", field, value),
            Filter::NotEquals { field, value } => write!(f, "({} != {:?})", field, value),
            Filter::In { field, values } => write!(f, "({} in {:?})", field, values),
            Filter::NotIn { field, values } => write!(f, "({} not in {:?})", field, values),
            Filter::Regex { field, pattern } => write!(f, "({} =~ /{}/)", field, pattern.pattern()),
            Filter::Range { field, bound } => {
                let lower = match &bound.lower {
                    Bound::Included(v) => format!("[{:?}", v),
                    Bound::Excluded(v) => format!("({:?}", v),
                    Bound::Unbounded => "(-inf".to_string(),
                };
                let upper = match &bound.upper {
                    Bound::Included(v) => format!("{:?}]", v),
                    Bound::Excluded(v) => format!("{:?})", v),
                    Bound::Unbounded => "+inf)".to_string(),
                };
                write!(f, "({} in {}, {})", field, lower, upper)
            }
            Filter::And(filters) => {
                let parts = filters.iter().map(|x| x.to_string()).collect::<Vec<_>>();
                write!(f, "({})", parts.join(" && "))
            }
            Filter::Or(filters) => {
                let parts = filters.iter().map(|x| x.to_string()).collect::<Vec<_>>();
                write!(f, "({})", parts.join(" || "))
            }
            Filter::Not(filter) => write!(f, "!{}", filter),
        }
    }
}

/// Creates a filter that matches all documents.
pub fn all() -> Filter {
    Filter::All
}

/// Creates a filter matching the record with the given id.
pub fn by_id(id: RecordId) -> Filter {
    Filter::Equals {
        field: DOC_ID.to_string(),
        value: Value::Id(id),
    }
}

/// Combines filters with logical AND.
///
/// `All` operands are dropped and nested `And`s are flattened, so composing optional
/// query dimensions never produces redundant nesting. An empty input yields `All`.
pub fn and(filters: Vec<Filter>) -> Filter {
    let mut flat = Vec::with_capacity(filters.len());
    for filter in filters {
        match filter {
            Filter::All => {}
            Filter::And(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => Filter::All,
        1 => flat.remove(0),
        _ => Filter::And(flat),
    }
}

/// Combines filters with logical OR. Nested `Or`s are flattened.
///
/// An `All` operand makes the whole disjunction `All`.
pub fn or(filters: Vec<Filter>) -> Filter {
    let mut flat = Vec::with_capacity(filters.len());
    for filter in filters {
        match filter {
            Filter::All => return Filter::All,
            Filter::Or(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    if flat.len() == 1 {
        flat.remove(0)
    } else {
        Filter::Or(flat)
    }
}

/// Negates a filter.
pub fn not(filter: Filter) -> Filter {
    match filter {
        Filter::Not(inner) => *inner,
        other => Filter::Not(Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::filter::field;

    fn article() -> Document {
        doc! {
            title: "IPL explained",
            publish_state: "published",
            tags: ["ipl", "hair"],
            view_count: 12,
            metadata: { origin_address: "10.0.0.1" },
        }
    }

    #[test]
    fn equals_on_scalar_and_array_fields() {
        let doc = article();
        assert!(field("publish_state").eq("published").matches(&doc));
        assert!(field("tags").eq("hair").matches(&doc));
        assert!(!field("tags").eq("laser").matches(&doc));
        assert!(field("tags").eq(vec!["ipl", "hair"]).matches(&doc));
        assert!(field("metadata.origin_address").eq("10.0.0.1").matches(&doc));
    }

    #[test]
    fn missing_field_reads_as_null() {
        let doc = article();
        assert!(field("parent").eq(Value::Null).matches(&doc));
        assert!(!field("parent").ne(Value::Null).matches(&doc));
        assert!(field("parent").in_values(vec![Value::Null]).matches(&doc));
    }

    #[test]
    fn in_and_not_in() {
        let doc = article();
        assert!(field("tags").in_values(vec!["laser", "ipl"]).matches(&doc));
        assert!(field("tags").not_in(vec!["laser", "skin"]).matches(&doc));
        assert!(!field("publish_state").not_in(vec!["published"]).matches(&doc));
    }

    #[test]
    fn range_only_compares_same_kind() {
        let doc = article();
        assert!(field("view_count").gte(10).matches(&doc));
        assert!(field("view_count").between(10, 12.5).matches(&doc));
        assert!(!field("view_count").gt(12).matches(&doc));
        assert!(!field("title").gt(1).matches(&doc));
        assert!(!field("missing").lt(100).matches(&doc));
    }

    #[test]
    fn regex_matches_strings_only() {
        let doc = article();
        assert!(field("title").regex_case_insensitive("ipl").unwrap().matches(&doc));
        assert!(!field("title").regex("^ipl").unwrap().matches(&doc));
        assert!(!field("view_count").regex("12").unwrap().matches(&doc));
        assert!(field("tags").regex("^ha").unwrap().matches(&doc));
    }

    #[test]
    fn logical_combinators_flatten() {
        let f = all()
            .and(field("a").eq(1))
            .and(field("b").eq(2).and(field("c").eq(3)));
        match &f {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("unexpected {}", other),
        }
        assert!(and(vec![]).is_all());
        assert!(field("a").eq(1).or(all()).is_all());
        assert!(matches!(not(not(field("a").eq(1))), Filter::Equals { .. }));
    }

    #[test]
    fn logical_evaluation() {
        let doc = article();
        let filter = field("publish_state")
            .eq("draft")
            .or(field("tags").eq("ipl"))
            .and(field("view_count").gt(1).not().not());
        assert!(filter.matches(&doc));
        assert!(!field("tags").eq("ipl").not().matches(&doc));
        assert!(!Filter::Or(vec![]).matches(&doc));
    }

    #[test]
    fn by_id_matches_record() {
        let id = RecordId::new();
        let mut doc = article();
        doc.put(DOC_ID, id).unwrap();
        assert!(by_id(id).matches(&doc));
        assert!(!by_id(RecordId::new()).matches(&doc));
    }

    #[test]
    fn display() {
        let f = field("name").eq("x").and(field("order").gte(1));
        assert_eq!(f.to_string(), "((name == \"x\") && (order in [1, +inf)))");
    }
}
