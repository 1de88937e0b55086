use crate::collection::{Document, RecordId};
use crate::common::{Convertible, Value};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::repository::Schema;
use chrono::{DateTime, Utc};

/// A typed record stored in one collection.
///
/// Entities convert to and from their stored [Document] through [Convertible]. The
/// generic repository assigns `_id`, `created_at` and `updated_at`, so a new entity
/// may leave them empty.
pub trait Entity: Convertible<Output = Self> + Clone + Send + Sync + 'static {
    /// Name of the collection the entity is stored in.
    fn collection_name() -> &'static str;

    /// Name used in logs and operation observations.
    fn entity_name() -> &'static str;

    fn schema() -> Schema;

    fn id(&self) -> Option<RecordId>;

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Converts an entity into its document form.
pub(crate) fn to_document<T: Entity>(entity: &T) -> VitrineResult<Document> {
    match entity.to_value()? {
        Value::Document(doc) => Ok(doc),
        other => {
            log::error!(
                "{} converted to {} instead of a document",
                T::entity_name(),
                other.type_name()
            );
            Err(VitrineError::new(
                &format!("{} must convert to a document", T::entity_name()),
                ErrorKind::ObjectMappingError,
            ))
        }
    }
}

/// Converts a stored document back into an entity.
pub(crate) fn from_document<T: Entity>(document: Document) -> VitrineResult<T> {
    T::from_value(&Value::Document(document)).map_err(|e| {
        log::error!("Failed to map {} document: {}", T::entity_name(), e);
        VitrineError::new_with_cause(
            &format!("Failed to map stored {} record", T::entity_name()),
            ErrorKind::ObjectMappingError,
            e,
        )
    })
}

/// Reads a document out of a [Value] handed to [Convertible::from_value].
pub(crate) fn expect_document<'a>(value: &'a Value, entity: &str) -> VitrineResult<&'a Document> {
    value.as_document().ok_or_else(|| {
        VitrineError::new(
            &format!("Expected a document for {}, found {}", entity, value.type_name()),
            ErrorKind::ObjectMappingError,
        )
    })
}

/// Writes an optional field, leaving it out when `None`.
pub(crate) fn put_optional<T: Into<Value>>(
    document: &mut Document,
    key: &str,
    value: Option<T>,
) -> VitrineResult<()> {
    if let Some(value) = value {
        document.put(key, value)?;
    }
    Ok(())
}
