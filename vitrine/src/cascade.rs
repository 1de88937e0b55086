//! Removal of dangling references after a record is deleted.

use crate::collection::{RecordId, Update};
use crate::connection::Connection;
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::filter::field;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// How a collection refers to the deleted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An array of ids; the deleted id is pulled out of it.
    Array,
    /// A single id; the field is unset.
    Scalar,
}

/// A `(collection, field)` pair pointing at records of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    collection: String,
    field: String,
    kind: ReferenceKind,
}

impl Reference {
    pub fn array(collection: &str, field: &str) -> Self {
        Reference {
            collection: collection.to_string(),
            field: field.to_string(),
            kind: ReferenceKind::Array,
        }
    }

    pub fn scalar(collection: &str, field: &str) -> Self {
        Reference {
            collection: collection.to_string(),
            field: field.to_string(),
            kind: ReferenceKind::Scalar,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    fn update(&self, id: RecordId) -> Update {
        match self.kind {
            ReferenceKind::Array => Update::new().pull(&self.field, id),
            ReferenceKind::Scalar => Update::new().unset(&self.field),
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.collection, self.field)
    }
}

/// Records touched per reference by one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    modified: Vec<(Reference, u64)>,
}

impl CleanupReport {
    pub fn modified(&self) -> &[(Reference, u64)] {
        &self.modified
    }

    pub fn total_modified(&self) -> u64 {
        self.modified.iter().map(|(_, n)| n).sum()
    }
}

/// Strips the id of a deleted record from every collection that references it.
///
/// Each reference costs exactly one batched `update_many`, whatever the number of
/// referencing records. References are not merged per collection: a collection
/// holding both an array and a scalar reference is written once per field, and a
/// record carrying both is modified by each write. Referencing records keep their
/// `updated_at`.
///
/// Cleanup is best-effort and idempotent: every reference is attempted even when an
/// earlier one fails, and a failed run is recovered by running it again.
#[derive(Clone)]
pub struct ReferenceCleanup {
    connection: Connection,
    references: Vec<Reference>,
}

impl ReferenceCleanup {
    pub fn new(connection: Connection, references: Vec<Reference>) -> Self {
        ReferenceCleanup {
            connection,
            references,
        }
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Removes `id` from every reference.
    ///
    /// # Errors
    ///
    /// `PartialWrite` when one or more references could not be cleaned; the cause is
    /// the first store failure.
    pub async fn run(&self, id: RecordId) -> VitrineResult<CleanupReport> {
        if self.references.is_empty() {
            return Ok(CleanupReport::default());
        }

        let start = Instant::now();
        let store = self.connection.store().await?;
        let mut report = CleanupReport::default();
        let mut failed = Vec::new();

        for reference in &self.references {
            let filter = field(&reference.field).eq(id);
            match store
                .update_many(&reference.collection, &filter, &reference.update(id))
                .await
            {
                Ok(result) => report
                    .modified
                    .push((reference.clone(), result.modified_count())),
                Err(e) => {
                    log::error!("Failed to remove {} from {}: {}", id, reference, e);
                    failed.push((reference, e));
                }
            }
        }

        log::debug!(
            "Reference cleanup for {} touched {} record(s) in {:?}",
            id,
            report.total_modified(),
            start.elapsed()
        );

        if failed.is_empty() {
            return Ok(report);
        }

        let names = failed.iter().map(|(reference, _)| reference).join(", ");
        let attempted = self.references.len();
        let count = failed.len();
        let cause = failed.into_iter().map(|(_, e)| e).next();
        let message = format!(
            "Reference cleanup for {} failed on {} of {} reference(s): {}",
            id, count, attempted, names
        );
        Err(match cause {
            Some(cause) => VitrineError::new_with_cause(&message, ErrorKind::PartialWrite, cause),
            None => VitrineError::new(&message, ErrorKind::PartialWrite),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Document;
    use crate::common::Value;
    use crate::store::memory::{InMemoryModule, InMemoryStore};
    use crate::store::{DocumentStoreProvider, StoreOperation};

    async fn seed(store: &InMemoryStore, collection: &str, doc: Document) -> RecordId {
        store.insert(collection, doc).await.unwrap().id().unwrap()
    }

    fn connection(store: &InMemoryStore) -> Connection {
        Connection::builder()
            .store_module(InMemoryModule::with_store(store.clone()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn pulls_and_unsets_with_one_call_per_referencing_field() {
        let store = InMemoryStore::new();
        let a = RecordId::new();
        let b = RecordId::new();

        let mut first = Document::new();
        first.put("categories", vec![a, b]).unwrap();
        first.put("primary_category", a).unwrap();
        let first = seed(&store, "products", first).await;

        let mut second = Document::new();
        second.put("categories", vec![a]).unwrap();
        let second = seed(&store, "products", second).await;

        let cleanup = ReferenceCleanup::new(
            connection(&store),
            vec![
                Reference::array("products", "categories"),
                Reference::scalar("products", "primary_category"),
            ],
        );
        let before = store.metrics();
        let report = cleanup.run(a).await.unwrap();
        assert_eq!(store.metrics().since(&before).calls(StoreOperation::UpdateMany), 2);
        assert_eq!(report.total_modified(), 3);

        let docs = store
            .find("products", &crate::filter::all(), &Default::default())
            .await
            .unwrap();
        let first = docs.iter().find(|d| d.id() == Some(first)).unwrap();
        let second = docs.iter().find(|d| d.id() == Some(second)).unwrap();
        assert_eq!(first.get("categories"), Value::from(vec![b]));
        assert!(first.get("primary_category").is_null());
        assert_eq!(second.get("categories"), Value::Array(vec![]));
        assert!(!first.contains_key("updated_at"));
    }

    #[tokio::test]
    async fn failures_are_reported_after_every_reference_ran() {
        let store = InMemoryStore::new();
        let a = RecordId::new();
        let mut doc = Document::new();
        doc.put("categories", vec![a]).unwrap();
        seed(&store, "articles", doc).await;

        let cleanup = ReferenceCleanup::new(
            connection(&store),
            vec![
                Reference::array("products", "categories"),
                Reference::array("articles", "categories"),
            ],
        );
        store.fail_next(StoreOperation::UpdateMany, ErrorKind::Timeout);

        let err = cleanup.run(a).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::PartialWrite);
        assert!(err.message().contains("products.categories"));
        assert_eq!(err.cause().unwrap().kind(), &ErrorKind::Timeout);
        // the second reference still ran
        assert_eq!(store.metrics().calls(StoreOperation::UpdateMany), 2);

        // a rerun recovers
        assert!(cleanup.run(a).await.is_ok());
    }
}
