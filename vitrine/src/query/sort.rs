use crate::common::{SortOrder, SortableFields, DEFAULT_SORT, DOC_ID};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};

/// Parses a sort string such as `-created_at,name` into a multi-key sort.
///
/// Fields are comma separated and a leading `-` marks a descending key. Blank
/// entries are ignored; when nothing is left the default `-created_at` applies.
///
/// # Errors
///
/// A lone `-` (a descending marker without a field name) is rejected with
/// `InvalidOperation`.
pub fn parse_sort(input: &str) -> VitrineResult<SortableFields> {
    let fields = parse_fields(input)?;
    if fields.is_empty() {
        return parse_fields(DEFAULT_SORT);
    }
    Ok(fields)
}

/// Like [parse_sort], falling back to `default` when `input` is absent or blank.
pub fn parse_sort_or(input: Option<&str>, default: &str) -> VitrineResult<SortableFields> {
    match input {
        Some(sort) if !sort.trim().is_empty() => parse_sort(sort),
        _ => parse_sort(default),
    }
}

/// Appends `_id` as a final key so records with equal sort values keep a stable
/// order across pages. Ids grow with creation time, so the tiebreaker follows the
/// direction of the first key.
pub fn with_id_tiebreaker(fields: SortableFields) -> SortableFields {
    if fields.field_names().iter().any(|name| name == DOC_ID) {
        return fields;
    }
    let order = fields
        .sorting_order()
        .first()
        .map(|(_, order)| *order)
        .unwrap_or(SortOrder::Ascending);
    fields.add_sorted_field(DOC_ID, order)
}

fn parse_fields(input: &str) -> VitrineResult<SortableFields> {
    let mut fields = SortableFields::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, order) = match part.strip_prefix('-') {
            Some(name) => (name.trim(), SortOrder::Descending),
            None => (part.strip_prefix('+').unwrap_or(part).trim(), SortOrder::Ascending),
        };
        if name.is_empty() {
            return Err(VitrineError::new(
                &format!("Invalid sort field \"{}\"", part),
                ErrorKind::InvalidOperation,
            ));
        }
        fields = fields.add_sorted_field(name, order);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(fields: &SortableFields) -> Vec<(String, SortOrder)> {
        fields.sorting_order().to_vec()
    }

    #[test]
    fn empty_input_defaults_to_newest_first() {
        for input in ["", "   ", ",,", " , "] {
            let fields = parse_sort(input).unwrap();
            assert_eq!(
                pairs(&fields),
                vec![("created_at".to_string(), SortOrder::Descending)]
            );
        }
    }

    #[test]
    fn multiple_keys_keep_their_order() {
        let fields = parse_sort("-created_at, name,+order").unwrap();
        assert_eq!(
            pairs(&fields),
            vec![
                ("created_at".to_string(), SortOrder::Descending),
                ("name".to_string(), SortOrder::Ascending),
                ("order".to_string(), SortOrder::Ascending),
            ]
        );
    }

    #[test]
    fn lone_dash_is_rejected() {
        let err = parse_sort("name,-").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
    }

    #[test]
    fn tiebreaker_follows_first_key() {
        let fields = with_id_tiebreaker(parse_sort("-created_at,name").unwrap());
        assert_eq!(
            pairs(&fields).last().unwrap(),
            &("_id".to_string(), SortOrder::Descending)
        );

        let fields = with_id_tiebreaker(parse_sort("_id,name").unwrap());
        assert_eq!(fields.field_names(), vec!["_id", "name"]);
    }

    #[test]
    fn fallback_default() {
        let fields = parse_sort_or(None, "order,name").unwrap();
        assert_eq!(fields.field_names(), vec!["order", "name"]);
        let fields = parse_sort_or(Some("title"), "order").unwrap();
        assert_eq!(fields.field_names(), vec!["title"]);
    }
}
