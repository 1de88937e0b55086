use crate::collection::{
    BulkWriteResult, Document, FindOptions, RecordId, Update, UpdateOptions, WriteModel,
    WriteResult,
};
use crate::common::{now, Value, DOC_CREATED_AT, DOC_ID, DOC_UPDATED_AT};
use crate::config::EngineConfig;
use crate::connection::Connection;
use crate::errors::{VitrineError, VitrineResult};
use crate::filter::{by_id, Filter};
use crate::query::{parse_sort_or, with_id_tiebreaker, PageRequest, Paginated};
use crate::repository::{
    from_document, to_document, Entity, IdRef, OperationEvent, OperationOutcome,
};
use crate::store::DocumentStore;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Typed CRUD, counting and pagination over the collection of one [Entity].
///
/// A repository is a thin, cheap-to-clone view over an injected [Connection]; any
/// number of repositories can share one connection. Unique indexes declared in the
/// entity's schema are created on first use.
///
/// # Errors
///
/// Every operation returns either a client-input error (validation, cast, duplicate
/// key, ...) or an infrastructure error. Infrastructure errors are logged with the
/// operation, entity and duration before they are returned. Absence is never an
/// error: lookups return `None` or an empty list.
///
/// Every call, successful or not, is reported to the connection's
/// [crate::repository::OperationObserver].
///
/// # Examples
///
/// ```rust,ignore
/// let repository: Repository<Category> = Repository::new(connection);
/// let lasers = repository.create(Category::new("Lasers", "lasers")).await?;
/// let found = repository.find_by_id(&lasers).await?;
/// let page = repository.find_paginated(all(), 1, Some(20), Some("order,name")).await?;
/// ```
pub struct Repository<T: Entity> {
    connection: Connection,
    indexes: Arc<OnceCell<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            connection: self.connection.clone(),
            indexes: self.indexes.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(connection: Connection) -> Self {
        Repository {
            connection,
            indexes: Arc::new(OnceCell::new()),
            _marker: PhantomData,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn config(&self) -> &EngineConfig {
        self.connection.config()
    }

    /// All matching records, sorted and windowed by `options`. No implicit limit.
    pub async fn find_all(&self, filter: Filter, options: FindOptions) -> VitrineResult<Vec<T>> {
        self.observe("find_all", async {
            let documents = self.find_raw(&filter, &options).await?;
            documents.into_iter().map(from_document::<T>).collect()
        })
        .await
    }

    /// Like [Repository::find_all] but returns the stored documents untouched.
    pub async fn find_documents(
        &self,
        filter: Filter,
        options: FindOptions,
    ) -> VitrineResult<Vec<Document>> {
        self.observe("find_documents", self.find_raw(&filter, &options))
            .await
    }

    /// One page of matching records plus the total match count.
    ///
    /// `page` is 1-based; `limit` falls back to the configured default and is clamped
    /// to the configured maximum; `sort` uses the `-created_at,name` format and falls
    /// back to the configured default sort. Data and total are read concurrently.
    pub async fn find_paginated(
        &self,
        filter: Filter,
        page: u64,
        limit: Option<u64>,
        sort: Option<&str>,
    ) -> VitrineResult<Paginated<T>> {
        self.observe("find_paginated", async {
            let request = PageRequest::from_config(page, limit, self.config());
            let sort = with_id_tiebreaker(parse_sort_or(sort, self.config().default_sort())?);
            let options = FindOptions::new()
                .sort(sort)
                .skip(request.skip())
                .limit(request.limit());

            let store = self.store().await?;
            let collection = T::collection_name();
            let (documents, total) = tokio::try_join!(
                store.find(collection, &filter, &options),
                store.count(collection, &filter)
            )?;

            let data = documents
                .into_iter()
                .map(from_document::<T>)
                .collect::<VitrineResult<Vec<T>>>()?;
            Ok(Paginated::new(data, total, request))
        })
        .await
    }

    pub async fn find_one(&self, filter: Filter) -> VitrineResult<Option<T>> {
        self.observe("find_one", self.find_first(&filter)).await
    }

    /// Looks a record up by id. Accepts a [crate::collection::RecordId], an id string
    /// or any record carrying an id.
    pub async fn find_by_id<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<T>> {
        let id = id.into();
        self.observe("find_by_id", async {
            match id.resolve()? {
                Some(id) => self.find_first(&by_id(id)).await,
                None => Ok(None),
            }
        })
        .await
    }

    /// Validates and inserts a new record.
    ///
    /// The repository assigns a fresh id plus `created_at` and `updated_at`; ids or
    /// timestamps already set on `entity` are replaced.
    pub async fn create(&self, entity: T) -> VitrineResult<T> {
        self.observe("create", async {
            let mut document = to_document(&entity)?;
            let timestamp = now();
            document.remove(DOC_ID);
            document.put(DOC_ID, RecordId::new())?;
            document.put(DOC_CREATED_AT, timestamp)?;
            document.put(DOC_UPDATED_AT, timestamp)?;

            let document = T::schema().validate_document(&document)?;
            let store = self.store().await?;
            let inserted = store.insert(T::collection_name(), document).await?;
            from_document(inserted)
        })
        .await
    }

    pub async fn update_by_id<I: Into<IdRef>>(
        &self,
        id: I,
        update: Update,
        options: UpdateOptions,
    ) -> VitrineResult<Option<T>> {
        let id = id.into();
        self.observe("update_by_id", async {
            match id.resolve()? {
                Some(id) => self.update_first(&by_id(id), update, options).await,
                None => Ok(None),
            }
        })
        .await
    }

    /// Atomically patches the first matching record.
    ///
    /// With default options the patched fields are validated and the record is
    /// returned as it is after the update. `updated_at` is always refreshed.
    pub async fn update_one(
        &self,
        filter: Filter,
        update: Update,
        options: UpdateOptions,
    ) -> VitrineResult<Option<T>> {
        self.observe("update_one", self.update_first(&filter, update, options))
            .await
    }

    /// Patches every matching record in one store call.
    pub async fn update_many(&self, filter: Filter, update: Update) -> VitrineResult<WriteResult> {
        self.observe("update_many", async {
            let update = self.prepare_update(update, true)?;
            let store = self.store().await?;
            store
                .update_many(T::collection_name(), &filter, &update)
                .await
        })
        .await
    }

    pub async fn delete_by_id<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<T>> {
        let id = id.into();
        self.observe("delete_by_id", async {
            match id.resolve()? {
                Some(id) => self.delete_first(&by_id(id)).await,
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn delete_one(&self, filter: Filter) -> VitrineResult<Option<T>> {
        self.observe("delete_one", self.delete_first(&filter)).await
    }

    /// Deletes every matching record and returns how many were removed.
    pub async fn delete_many(&self, filter: Filter) -> VitrineResult<u64> {
        self.observe("delete_many", async {
            let store = self.store().await?;
            store.delete_many(T::collection_name(), &filter).await
        })
        .await
    }

    pub async fn count(&self, filter: Filter) -> VitrineResult<u64> {
        self.observe("count", async {
            let store = self.store().await?;
            store.count(T::collection_name(), &filter).await
        })
        .await
    }

    pub async fn exists(&self, filter: Filter) -> VitrineResult<bool> {
        self.observe("exists", async {
            let documents = self
                .find_raw(&filter, &FindOptions::new().limit(1))
                .await?;
            Ok(!documents.is_empty())
        })
        .await
    }

    /// Sends independent point writes as one unordered batch.
    ///
    /// Every update is validated before anything is sent, so a client-input error
    /// rejects the whole batch. Elements that fail in the store are reported in the
    /// result; the batch is not rolled back and may be re-issued as a whole.
    pub async fn bulk_write(&self, models: Vec<WriteModel>) -> VitrineResult<BulkWriteResult> {
        self.observe("bulk_write", async {
            let models = models
                .into_iter()
                .map(|model| self.prepare_model(model))
                .collect::<VitrineResult<Vec<_>>>()?;

            let store = self.store().await?;
            let result = store.bulk_write(T::collection_name(), models).await?;
            if !result.is_complete() {
                log::error!(
                    "Bulk write on {} left {} failed element(s)",
                    T::entity_name(),
                    result.failures().len()
                );
            }
            Ok(result)
        })
        .await
    }

    /// Counts matching records grouped by `field`, in one aggregation pass.
    pub async fn count_by(&self, filter: Filter, field: &str) -> VitrineResult<Vec<(Value, u64)>> {
        self.observe("count_by", async {
            let store = self.store().await?;
            store.count_by(T::collection_name(), &filter, field).await
        })
        .await
    }

    async fn store(&self) -> VitrineResult<DocumentStore> {
        let store = self.connection.store().await?;
        self.indexes
            .get_or_try_init(|| async {
                for field in T::schema().unique_fields() {
                    store
                        .ensure_unique_index(T::collection_name(), field)
                        .await?;
                }
                Ok::<(), VitrineError>(())
            })
            .await?;
        Ok(store)
    }

    async fn find_raw(&self, filter: &Filter, options: &FindOptions) -> VitrineResult<Vec<Document>> {
        let store = self.store().await?;
        store.find(T::collection_name(), filter, options).await
    }

    async fn find_first(&self, filter: &Filter) -> VitrineResult<Option<T>> {
        let mut documents = self
            .find_raw(filter, &FindOptions::new().limit(1))
            .await?;
        documents.pop().map(from_document::<T>).transpose()
    }

    async fn update_first(
        &self,
        filter: &Filter,
        update: Update,
        options: UpdateOptions,
    ) -> VitrineResult<Option<T>> {
        let update = self.prepare_update(update, options.is_run_validators())?;
        let store = self.store().await?;
        let document = store
            .find_one_and_update(
                T::collection_name(),
                filter,
                &update,
                options.is_return_updated(),
            )
            .await?;
        document.map(from_document::<T>).transpose()
    }

    async fn delete_first(&self, filter: &Filter) -> VitrineResult<Option<T>> {
        let store = self.store().await?;
        let document = store
            .find_one_and_delete(T::collection_name(), filter)
            .await?;
        document.map(from_document::<T>).transpose()
    }

    fn prepare_model(&self, model: WriteModel) -> VitrineResult<WriteModel> {
        Ok(match model {
            WriteModel::UpdateOne { filter, update } => WriteModel::UpdateOne {
                filter,
                update: self.prepare_update(update, true)?,
            },
            WriteModel::UpdateMany { filter, update } => WriteModel::UpdateMany {
                filter,
                update: self.prepare_update(update, true)?,
            },
            delete => delete,
        })
    }

    fn prepare_update(&self, update: Update, validate: bool) -> VitrineResult<Update> {
        let update = if validate {
            T::schema().validate_update(&update)?
        } else {
            update
        };
        Ok(update.set(DOC_UPDATED_AT, now()))
    }

    /// Times `operation`, logs infrastructure failures and reports to the observer.
    async fn observe<R, F>(&self, operation: &'static str, future: F) -> VitrineResult<R>
    where
        F: Future<Output = VitrineResult<R>>,
    {
        let start = Instant::now();
        let result = future.await;
        let duration = start.elapsed();

        let result = result.map_err(|e| {
            if e.is_client_error() {
                e
            } else {
                log::error!(
                    "{}.{} failed after {:?}: {}",
                    T::entity_name(),
                    operation,
                    duration,
                    e
                );
                let kind = e.kind().clone();
                VitrineError::new_with_cause(
                    &format!("Failed to {} {}", operation, T::entity_name()),
                    kind,
                    e,
                )
            }
        });

        self.config().observer().observe(&OperationEvent {
            operation,
            entity: T::entity_name(),
            duration,
            outcome: OperationOutcome::from_result(&result),
        });
        result
    }
}
