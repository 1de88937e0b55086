use super::collection::MemoryCollection;
use crate::collection::{BulkWriteResult, Document, FindOptions, Update, WriteModel, WriteResult};
use crate::common::Value;
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::filter::Filter;
use crate::store::{DocumentStoreProvider, MetricsSnapshot, StoreMetrics, StoreOperation};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// In-memory implementation of a document store.
///
/// # Characteristics
/// - **Thread-Safe**: collections live in a `DashMap`, each guarded by its own lock
/// - **Native atomicity**: every single-record call holds its collection's lock
/// - **Instrumented**: every call is counted and timed in [StoreMetrics]
/// - **No Persistence**: all data is lost when the last handle is dropped
///
/// Cloning is cheap and every clone sees the same data.
///
/// # Usage
/// ```text
/// let store = InMemoryStore::new();
/// let connection = Connection::builder()
///     .store_module(InMemoryModule::with_store(store.clone()))
///     .build()?;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner::default()),
        }
    }

    /// Makes the next call of `operation` fail with an error of `kind`.
    ///
    /// Used to exercise infrastructure-failure paths of the layers above.
    pub fn fail_next(&self, operation: StoreOperation, kind: ErrorKind) {
        self.inner.injected_failures.lock().push((operation, kind));
    }

    pub fn reset_metrics(&self) {
        self.inner.metrics.reset();
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of documents stored in `collection`.
    pub fn collection_size(&self, collection: &str) -> usize {
        self.inner
            .collections
            .get(collection)
            .map(|c| c.size())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStoreProvider for InMemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> VitrineResult<Vec<Document>> {
        self.inner.execute(StoreOperation::Find, collection, |c| {
            Ok(c.find(filter, options))
        })
    }

    async fn count(&self, collection: &str, filter: &Filter) -> VitrineResult<u64> {
        self.inner
            .execute(StoreOperation::Count, collection, |c| Ok(c.count(filter)))
    }

    async fn insert(&self, collection: &str, document: Document) -> VitrineResult<Document> {
        self.inner
            .execute(StoreOperation::Insert, collection, |c| c.insert(document))
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        return_updated: bool,
    ) -> VitrineResult<Option<Document>> {
        self.inner
            .execute(StoreOperation::FindOneAndUpdate, collection, |c| {
                c.find_one_and_update(filter, update, return_updated)
            })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> VitrineResult<WriteResult> {
        self.inner.execute(StoreOperation::UpdateMany, collection, |c| {
            c.update_many(filter, update)
        })
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> VitrineResult<Option<Document>> {
        self.inner
            .execute(StoreOperation::FindOneAndDelete, collection, |c| {
                Ok(c.find_one_and_delete(filter))
            })
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> VitrineResult<u64> {
        self.inner.execute(StoreOperation::DeleteMany, collection, |c| {
            Ok(c.delete_many(filter))
        })
    }

    async fn bulk_write(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
    ) -> VitrineResult<BulkWriteResult> {
        self.inner.execute(StoreOperation::BulkWrite, collection, |c| {
            Ok(c.bulk_write(models))
        })
    }

    async fn count_by(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
    ) -> VitrineResult<Vec<(Value, u64)>> {
        self.inner.execute(StoreOperation::CountBy, collection, |c| {
            Ok(c.count_by(filter, field))
        })
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> VitrineResult<()> {
        self.inner.check_open()?;
        self.inner.collection(collection).ensure_unique_index(field)
    }

    async fn close(&self) -> VitrineResult<()> {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            log::debug!("In-memory document store closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

#[derive(Default)]
struct InMemoryStoreInner {
    collections: DashMap<String, Arc<MemoryCollection>>,
    closed: AtomicBool,
    metrics: StoreMetrics,
    injected_failures: Mutex<Vec<(StoreOperation, ErrorKind)>>,
}

impl InMemoryStoreInner {
    fn collection(&self, name: &str) -> Arc<MemoryCollection> {
        let entry = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new()));
        Arc::clone(entry.value())
    }

    fn check_open(&self) -> VitrineResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(VitrineError::new(
                "Document store is closed",
                ErrorKind::ConnectionError,
            ));
        }
        Ok(())
    }

    fn take_injected_failure(&self, operation: StoreOperation) -> VitrineResult<()> {
        let mut failures = self.injected_failures.lock();
        if let Some(position) = failures.iter().position(|(op, _)| *op == operation) {
            let (_, kind) = failures.remove(position);
            return Err(VitrineError::new(
                &format!("Injected {} failure", operation),
                kind,
            ));
        }
        Ok(())
    }

    /// Runs `f` against the named collection, counting and timing the call.
    fn execute<T>(
        &self,
        operation: StoreOperation,
        collection: &str,
        f: impl FnOnce(&MemoryCollection) -> VitrineResult<T>,
    ) -> VitrineResult<T> {
        let start = Instant::now();
        let result = self
            .check_open()
            .and_then(|_| self.take_injected_failure(operation))
            .and_then(|_| f(&self.collection(collection)));
        self.metrics
            .record(operation, start.elapsed(), result.is_err());
        result
    }
}
