use crate::collection::{BulkWriteResult, Document, FindOptions, RecordId, Update, WriteModel, WriteResult};
use crate::common::{SortOrder, SortableFields, Value, DOC_ID};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::filter::Filter;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One collection of the in-memory store.
///
/// Documents are keyed by their time-ordered [RecordId], so iteration order is
/// insertion order. A single `RwLock` guards the collection: every call holds it for
/// its whole duration, which makes each single-record call atomic.
pub(crate) struct MemoryCollection {
    data: RwLock<CollectionData>,
}

#[derive(Default)]
struct CollectionData {
    documents: BTreeMap<RecordId, Document>,
    unique_fields: Vec<String>,
}

impl MemoryCollection {
    pub(crate) fn new() -> Self {
        MemoryCollection {
            data: RwLock::new(CollectionData::default()),
        }
    }

    pub(crate) fn find(&self, filter: &Filter, options: &FindOptions) -> Vec<Document> {
        let data = self.data.read();
        let mut matched: Vec<Document> = data
            .documents
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();
        drop(data);

        if let Some(fields) = options.sorting() {
            sort_documents(&mut matched, fields);
        }

        let skip = options.skip_count().unwrap_or(0) as usize;
        let limit = options.limit_count().map(|l| l as usize).unwrap_or(usize::MAX);
        matched.into_iter().skip(skip).take(limit).collect()
    }

    pub(crate) fn count(&self, filter: &Filter) -> u64 {
        let data = self.data.read();
        data.documents.values().filter(|doc| filter.matches(doc)).count() as u64
    }

    pub(crate) fn insert(&self, mut document: Document) -> VitrineResult<Document> {
        let id = match document.id() {
            Some(id) => id,
            None => {
                let id = RecordId::new();
                document.put(DOC_ID, id)?;
                id
            }
        };

        let mut data = self.data.write();
        if data.documents.contains_key(&id) {
            log::debug!("Insert rejected, id {} already exists", id);
            return Err(VitrineError::duplicate_key(DOC_ID));
        }
        data.check_unique(&document)?;
        data.documents.insert(id, document.clone());
        Ok(document)
    }

    pub(crate) fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        return_updated: bool,
    ) -> VitrineResult<Option<Document>> {
        let mut data = self.data.write();
        data.update_one(filter, update)
            .map(|found| found.map(|(before, after)| if return_updated { after } else { before }))
    }

    pub(crate) fn update_many(&self, filter: &Filter, update: &Update) -> VitrineResult<WriteResult> {
        let mut data = self.data.write();
        data.update_many(filter, update)
    }

    pub(crate) fn find_one_and_delete(&self, filter: &Filter) -> Option<Document> {
        let mut data = self.data.write();
        data.delete_one(filter)
    }

    pub(crate) fn delete_many(&self, filter: &Filter) -> u64 {
        let mut data = self.data.write();
        let before = data.documents.len();
        data.documents.retain(|_, doc| !filter.matches(doc));
        (before - data.documents.len()) as u64
    }

    /// Runs every model on its own; the lock is taken per element, so the batch as a
    /// whole is not atomic.
    pub(crate) fn bulk_write(&self, models: Vec<WriteModel>) -> BulkWriteResult {
        let (mut matched, mut modified, mut deleted) = (0u64, 0u64, 0u64);
        let mut failures = Vec::new();

        for (index, model) in models.into_iter().enumerate() {
            let mut data = self.data.write();
            let outcome = match model {
                WriteModel::UpdateOne { filter, update } => {
                    data.update_one(&filter, &update).map(|found| {
                        if let Some((before, after)) = found {
                            matched += 1;
                            if before != after {
                                modified += 1;
                            }
                        }
                    })
                }
                WriteModel::UpdateMany { filter, update } => {
                    data.update_many(&filter, &update).map(|result| {
                        matched += result.matched_count();
                        modified += result.modified_count();
                    })
                }
                WriteModel::DeleteOne { filter } => {
                    if data.delete_one(&filter).is_some() {
                        deleted += 1;
                    }
                    Ok(())
                }
            };

            if let Err(err) = outcome {
                log::debug!("Bulk write element {} failed: {}", index, err);
                failures.push((index, err));
            }
        }

        BulkWriteResult::new(matched, modified, deleted, failures)
    }

    pub(crate) fn count_by(&self, filter: &Filter, field: &str) -> Vec<(Value, u64)> {
        let data = self.data.read();
        let mut groups: BTreeMap<Value, u64> = BTreeMap::new();
        for doc in data.documents.values().filter(|doc| filter.matches(doc)) {
            *groups.entry(doc.get(field)).or_insert(0) += 1;
        }
        groups.into_iter().collect()
    }

    pub(crate) fn ensure_unique_index(&self, field: &str) -> VitrineResult<()> {
        let mut data = self.data.write();
        if data.unique_fields.iter().any(|f| f == field) {
            return Ok(());
        }

        let mut seen = Vec::new();
        for doc in data.documents.values() {
            let value = doc.get(field);
            if value.is_null() {
                continue;
            }
            if seen.contains(&value) {
                log::error!("Cannot create unique index on {}, duplicate value {:?}", field, value);
                return Err(VitrineError::new(
                    &format!("Cannot create unique index on {}, duplicate values exist", field),
                    ErrorKind::StoreError,
                ));
            }
            seen.push(value);
        }
        data.unique_fields.push(field.to_string());
        Ok(())
    }

    pub(crate) fn size(&self) -> usize {
        self.data.read().documents.len()
    }
}

impl CollectionData {
    /// Applies `update` to the first match, returning `(before, after)`.
    fn update_one(&mut self, filter: &Filter, update: &Update) -> VitrineResult<Option<(Document, Document)>> {
        let found = self
            .documents
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, doc)| (*id, doc.clone()));

        let (id, before) = match found {
            Some(found) => found,
            None => return Ok(None),
        };

        let mut after = before.clone();
        if update.apply(&mut after)? {
            self.check_unique(&after)?;
            self.documents.insert(id, after.clone());
        }
        Ok(Some((before, after)))
    }

    /// Applies `update` to every match. Either every matching document is updated or,
    /// when a unique index would be violated, none is.
    fn update_many(&mut self, filter: &Filter, update: &Update) -> VitrineResult<WriteResult> {
        let mut matched = 0u64;
        let mut changed = Vec::new();
        for (id, doc) in self.documents.iter().filter(|(_, doc)| filter.matches(doc)) {
            matched += 1;
            let mut next = doc.clone();
            if update.apply(&mut next)? {
                changed.push((*id, next));
            }
        }

        if !changed.is_empty() && !self.unique_fields.is_empty() {
            let mut staged = self.documents.clone();
            for (id, doc) in &changed {
                staged.insert(*id, doc.clone());
            }
            for (_, doc) in &changed {
                check_unique_in(&staged, &self.unique_fields, doc)?;
            }
        }

        let modified = changed.len() as u64;
        for (id, doc) in changed {
            self.documents.insert(id, doc);
        }
        Ok(WriteResult::new(matched, modified))
    }

    fn delete_one(&mut self, filter: &Filter) -> Option<Document> {
        let id = self
            .documents
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| *id)?;
        self.documents.remove(&id)
    }

    fn check_unique(&self, candidate: &Document) -> VitrineResult<()> {
        check_unique_in(&self.documents, &self.unique_fields, candidate)
    }
}

fn check_unique_in(
    documents: &BTreeMap<RecordId, Document>,
    unique_fields: &[String],
    candidate: &Document,
) -> VitrineResult<()> {
    let id = candidate.id();
    for field in unique_fields {
        let value = candidate.get(field);
        if value.is_null() {
            continue;
        }
        let taken = documents
            .iter()
            .any(|(other_id, other)| Some(*other_id) != id && other.get(field) == value);
        if taken {
            log::debug!("Unique index violation on {} for value {:?}", field, value);
            return Err(VitrineError::duplicate_key(field));
        }
    }
    Ok(())
}

fn sort_documents(documents: &mut [Document], fields: &SortableFields) {
    documents.sort_by(|a, b| {
        for (field, order) in fields.sorting_order() {
            let ordering = a.get(field).cmp(&b.get(field));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
