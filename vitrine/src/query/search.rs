use crate::errors::VitrineResult;
use crate::filter::{field, or, Filter};

/// Escapes every regex metacharacter so `term` matches only as a literal.
pub fn escape_search_term(term: &str) -> String {
    regex::escape(term)
}

/// Builds a case-insensitive substring search over `fields`, OR-ed together.
///
/// The raw term is trimmed and escaped first, so input such as `a.b*c` matches the
/// literal text `a.b*c` and can never inject a pattern. A blank term, or an empty
/// field list, yields `None`.
///
/// # Examples
///
/// ```rust,ignore
/// let filter = build_search_filter("ipl", &["title", "description"])?;
/// ```
pub fn build_search_filter(term: &str, fields: &[&str]) -> VitrineResult<Option<Filter>> {
    let term = term.trim();
    if term.is_empty() || fields.is_empty() {
        return Ok(None);
    }

    let pattern = escape_search_term(term);
    let filters = fields
        .iter()
        .map(|name| field(name).regex_case_insensitive(&pattern))
        .collect::<VitrineResult<Vec<_>>>()?;
    Ok(Some(or(filters)))
}
