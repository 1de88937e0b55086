use crate::errors::VitrineResult;
use crate::store::memory::InMemoryStore;
use crate::store::{DocumentStore, StoreModule};
use async_trait::async_trait;

/// [StoreModule] backed by the [InMemoryStore].
///
/// By default every `open` creates a fresh, empty store. [InMemoryModule::with_store]
/// hands out an existing store instead, so a caller can keep a handle to it.
#[derive(Default, Clone)]
pub struct InMemoryModule {
    store: Option<InMemoryStore>,
}

impl InMemoryModule {
    pub fn new() -> InMemoryModule {
        InMemoryModule { store: None }
    }

    pub fn with_store(store: InMemoryStore) -> InMemoryModule {
        InMemoryModule { store: Some(store) }
    }
}

#[async_trait]
impl StoreModule for InMemoryModule {
    async fn open(&self) -> VitrineResult<DocumentStore> {
        let store = self.store.clone().unwrap_or_default();
        log::debug!("Opening in-memory document store");
        Ok(DocumentStore::new(store))
    }
}
