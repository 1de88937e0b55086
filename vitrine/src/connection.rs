use crate::config::EngineConfig;
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::repository::OperationObserver;
use crate::store::memory::InMemoryModule;
use crate::store::{DocumentStore, StoreModule};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Shared handle to the document store, injected into every repository.
///
/// The store is opened lazily by the configured [StoreModule] on the first call of
/// [Connection::store] and reused for the lifetime of the connection. Concurrent
/// first calls wait for the same initialization. Cloning a `Connection` is cheap and
/// every clone shares the same store.
///
/// # Examples
///
/// ```rust,ignore
/// let connection = Connection::builder()
///     .store_module(InMemoryModule::new())
///     .max_page_limit(50)
///     .build()?;
///
/// let categories = CategoryRepository::new(connection.clone());
/// // ...
/// connection.close().await?;
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    config: EngineConfig,
    module: Box<dyn StoreModule>,
    store: OnceCell<DocumentStore>,
    closed: AtomicBool,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// A connection to a fresh in-memory store with default settings.
    pub fn in_memory() -> Connection {
        Connection::new(EngineConfig::default(), Box::new(InMemoryModule::new()))
    }

    fn new(config: EngineConfig, module: Box<dyn StoreModule>) -> Connection {
        Connection {
            inner: Arc::new(ConnectionInner {
                config,
                module,
                store: OnceCell::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns the store, opening it on first use.
    ///
    /// # Errors
    ///
    /// Fails with `ConnectionError` once the connection is closed, or with whatever
    /// the store module reports while opening. A failed open is retried on the next
    /// call. A store that finishes opening after [Connection::close] is closed
    /// before the error is returned.
    pub async fn store(&self) -> VitrineResult<DocumentStore> {
        if self.is_closed() {
            return Err(VitrineError::new(
                "Connection is closed",
                ErrorKind::ConnectionError,
            ));
        }

        let store = self
            .inner
            .store
            .get_or_try_init(|| async {
                log::debug!("Opening document store");
                self.inner.module.open().await.map_err(|e| {
                    log::error!("Failed to open document store: {}", e);
                    e
                })
            })
            .await?;

        // close() may have run while the store was still opening
        if self.is_closed() {
            if !store.is_closed() {
                store.close().await?;
            }
            return Err(VitrineError::new(
                "Connection is closed",
                ErrorKind::ConnectionError,
            ));
        }
        Ok(store.clone())
    }

    /// Whether the store has been opened.
    pub fn is_initialized(&self) -> bool {
        self.inner.store.initialized()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Closes the store if it was opened. Idempotent.
    pub async fn close(&self) -> VitrineResult<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(store) = self.inner.store.get() {
            store.close().await?;
        }
        log::debug!("Connection closed");
        Ok(())
    }
}

/// Builder for a [Connection].
///
/// Configuration errors are captured and returned by [ConnectionBuilder::build], so a
/// chain of setters never has to be interrupted.
pub struct ConnectionBuilder {
    error: Option<VitrineError>,
    config: EngineConfig,
    module: Option<Box<dyn StoreModule>>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        ConnectionBuilder {
            error: None,
            config: EngineConfig::new(),
            module: None,
        }
    }

    /// Sets the module that opens the document store. Defaults to [InMemoryModule].
    pub fn store_module<M: StoreModule + 'static>(mut self, module: M) -> Self {
        self.module = Some(Box::new(module));
        self
    }

    pub fn max_page_limit(mut self, limit: u64) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_max_page_limit(limit) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn default_page_limit(mut self, limit: u64) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_default_page_limit(limit) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn default_sort(mut self, sort: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_default_sort(sort) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn related_limit(mut self, limit: u64) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_related_limit(limit) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn observer(mut self, observer: Arc<dyn OperationObserver>) -> Self {
        self.config.set_observer(observer);
        self
    }

    /// Builds the connection. The store itself is opened on first use.
    pub fn build(self) -> VitrineResult<Connection> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let module = self
            .module
            .unwrap_or_else(|| Box::new(InMemoryModule::new()));
        Ok(Connection::new(self.config, module))
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        ConnectionBuilder::new()
    }
}
