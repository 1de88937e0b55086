//! Document store abstraction.
//!
//! The engine talks to its document store only through [DocumentStoreProvider]. A
//! provider owns collections of [Document]s and offers the primitives the engine
//! needs:
//!
//! - filtered, sorted, windowed reads and counts
//! - atomic single-record updates (`find_one_and_update`)
//! - multi-record updates and deletes
//! - unordered bulk writes of independent point updates
//! - grouped counts for statistics
//! - unique indexes
//!
//! Providers are wrapped in the cheap-to-clone [DocumentStore] handle and produced
//! by a [StoreModule] when a connection is first used. The in-memory provider in
//! [memory] is the reference backend.

pub mod memory;
mod metrics;

pub use metrics::*;

use crate::collection::{BulkWriteResult, Document, FindOptions, Update, WriteModel, WriteResult};
use crate::common::Value;
use crate::errors::VitrineResult;
use crate::filter::Filter;
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

/// Low-level interface every document store backend implements.
///
/// # Atomicity
/// Each single-record call is atomic on its own. Multi-record calls
/// (`update_many`, `delete_many`, `bulk_write`) are not transactional as a whole.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; one provider is shared by every repository
/// of a connection.
#[async_trait]
pub trait DocumentStoreProvider: Send + Sync {
    /// Returns the documents of `collection` matching `filter`, sorted and windowed
    /// by `options`. Without a sort, documents come back in insertion order.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> VitrineResult<Vec<Document>>;

    async fn count(&self, collection: &str, filter: &Filter) -> VitrineResult<u64>;

    /// Inserts a document carrying an `_id`.
    ///
    /// Fails with `DuplicateKey` when the id or a uniquely indexed value is taken.
    async fn insert(&self, collection: &str, document: Document) -> VitrineResult<Document>;

    /// Atomically applies `update` to the first matching document.
    ///
    /// Returns the document after the update when `return_updated` is set, the
    /// document before it otherwise, or `None` when nothing matched.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        return_updated: bool,
    ) -> VitrineResult<Option<Document>>;

    /// Applies `update` to every matching document in one call.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> VitrineResult<WriteResult>;

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> VitrineResult<Option<Document>>;

    /// Deletes every matching document and returns how many were removed.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> VitrineResult<u64>;

    /// Executes independent point writes in one unordered request.
    ///
    /// A failing element does not stop the others; failures are reported in the
    /// result rather than as an `Err`.
    async fn bulk_write(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
    ) -> VitrineResult<BulkWriteResult>;

    /// Counts matching documents grouped by the value of `field`, in one pass.
    async fn count_by(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
    ) -> VitrineResult<Vec<(Value, u64)>>;

    /// Declares `field` unique within `collection`. Idempotent.
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> VitrineResult<()>;

    /// Closes the store. Every later call fails with a connection error.
    async fn close(&self) -> VitrineResult<()>;

    fn is_closed(&self) -> bool;

    /// Snapshot of per-operation call counts and latencies.
    fn metrics(&self) -> MetricsSnapshot;
}

/// Shared handle to a [DocumentStoreProvider].
///
/// Cloning is cheap: it only increments the reference count.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<dyn DocumentStoreProvider>,
}

impl DocumentStore {
    pub fn new<T: DocumentStoreProvider + 'static>(inner: T) -> Self {
        DocumentStore {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for DocumentStore {
    type Target = Arc<dyn DocumentStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Produces the [DocumentStore] a connection uses.
///
/// `open` is called at most once per connection, on first use.
#[async_trait]
pub trait StoreModule: Send + Sync {
    async fn open(&self) -> VitrineResult<DocumentStore>;
}
