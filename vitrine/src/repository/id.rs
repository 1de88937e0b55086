use crate::collection::{Document, RecordId};
use crate::errors::VitrineResult;
use crate::repository::Entity;

/// Anything a record can be looked up by: an id, an id string or a record that
/// carries an id.
///
/// ```rust,ignore
/// repository.find_by_id(id).await?;
/// repository.find_by_id("0190f5c2-...").await?;
/// repository.find_by_id(&category).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRef {
    Id(RecordId),
    Raw(String),
    /// A record without an id; never matches anything.
    Missing,
}

impl IdRef {
    /// Normalizes to a [RecordId].
    ///
    /// # Errors
    ///
    /// A malformed id string is a cast error on `_id`.
    pub fn resolve(&self) -> VitrineResult<Option<RecordId>> {
        match self {
            IdRef::Id(id) => Ok(Some(*id)),
            IdRef::Raw(raw) => RecordId::parse(raw.trim()).map(Some),
            IdRef::Missing => Ok(None),
        }
    }
}

impl From<RecordId> for IdRef {
    fn from(id: RecordId) -> Self {
        IdRef::Id(id)
    }
}

impl From<&RecordId> for IdRef {
    fn from(id: &RecordId) -> Self {
        IdRef::Id(*id)
    }
}

impl From<Option<RecordId>> for IdRef {
    fn from(id: Option<RecordId>) -> Self {
        id.map(IdRef::Id).unwrap_or(IdRef::Missing)
    }
}

impl From<&str> for IdRef {
    fn from(raw: &str) -> Self {
        IdRef::Raw(raw.to_string())
    }
}

impl From<String> for IdRef {
    fn from(raw: String) -> Self {
        IdRef::Raw(raw)
    }
}

impl From<&String> for IdRef {
    fn from(raw: &String) -> Self {
        IdRef::Raw(raw.clone())
    }
}

impl From<&Document> for IdRef {
    fn from(document: &Document) -> Self {
        document.id().into()
    }
}

impl<T: Entity> From<&T> for IdRef {
    fn from(entity: &T) -> Self {
        entity.id().into()
    }
}
