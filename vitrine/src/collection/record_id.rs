use crate::errors::{VitrineError, VitrineResult};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of a stored record.
///
/// Identifiers are UUID v7 values, so they sort in creation order and can be
/// generated by the engine without a round trip to the store. The `_id` field of
/// every document holds one.
///
/// # Examples
///
/// ```rust,ignore
/// let id = RecordId::new();
/// let parsed = RecordId::parse(&id.to_string())?;
/// assert_eq!(id, parsed);
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordId {
    value: Uuid,
}

impl RecordId {
    /// Generates a new time-ordered identifier.
    pub fn new() -> Self {
        RecordId {
            value: Uuid::now_v7(),
        }
    }

    /// Parses an identifier from its hyphenated or simple string form.
    ///
    /// A malformed string is a cast error on the `_id` field.
    pub fn parse(value: &str) -> VitrineResult<RecordId> {
        Uuid::parse_str(value.trim())
            .map(|value| RecordId { value })
            .map_err(|_| VitrineError::cast(crate::common::DOC_ID, "Id"))
    }

    pub fn from_uuid(value: Uuid) -> Self {
        RecordId { value }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId::new()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value.hyphenated())
    }
}

impl Debug for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordId({})", self.value.hyphenated())
    }
}

impl FromStr for RecordId {
    type Err = VitrineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn new_ids_are_unique_and_ordered() {
        let ids: Vec<RecordId> = (0..100).map(|_| RecordId::new()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn parse_round_trips_display() {
        let id = RecordId::new();
        assert_eq!(RecordId::parse(&id.to_string()).unwrap(), id);
        assert_eq!(id.to_string().parse::<RecordId>().unwrap(), id);
    }

    #[test]
    fn parse_rejects_garbage_with_cast_error() {
        let err = RecordId::parse("lasers").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::CastError);
        assert!(err.message().contains("_id"));
    }
}
