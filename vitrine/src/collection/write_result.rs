use crate::collection::Update;
use crate::errors::VitrineError;
use crate::filter::Filter;

/// The result of a multi-document write (`update_many`, `delete_many`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResult {
    matched: u64,
    modified: u64,
}

impl WriteResult {
    pub fn new(matched: u64, modified: u64) -> Self {
        Self { matched, modified }
    }

    /// Number of documents the filter selected.
    pub fn matched_count(&self) -> u64 {
        self.matched
    }

    /// Number of documents that actually changed.
    pub fn modified_count(&self) -> u64 {
        self.modified
    }
}

/// One independent point write inside a bulk request.
#[derive(Debug, Clone)]
pub enum WriteModel {
    /// Update the first document matching the filter.
    UpdateOne { filter: Filter, update: Update },
    /// Update every document matching the filter.
    UpdateMany { filter: Filter, update: Update },
    /// Delete the first document matching the filter.
    DeleteOne { filter: Filter },
}

/// The outcome of an unordered bulk write.
///
/// A bulk write is not transactional: elements that failed are reported in
/// [BulkWriteResult::failures] while the other elements stay applied. Every element
/// the engine issues is idempotent, so recovery means re-issuing the whole batch.
#[derive(Debug, Clone, Default)]
pub struct BulkWriteResult {
    matched: u64,
    modified: u64,
    deleted: u64,
    failures: Vec<(usize, VitrineError)>,
}

impl BulkWriteResult {
    pub fn new(matched: u64, modified: u64, deleted: u64, failures: Vec<(usize, VitrineError)>) -> Self {
        Self {
            matched,
            modified,
            deleted,
            failures,
        }
    }

    pub fn matched_count(&self) -> u64 {
        self.matched
    }

    pub fn modified_count(&self) -> u64 {
        self.modified
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted
    }

    /// Failed elements as `(index in the batch, error)`.
    pub fn failures(&self) -> &[(usize, VitrineError)] {
        &self.failures
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn write_result_counts() {
        let result = WriteResult::new(3, 2);
        assert_eq!(result.matched_count(), 3);
        assert_eq!(result.modified_count(), 2);
    }

    #[test]
    fn bulk_result_completeness() {
        assert!(BulkWriteResult::new(2, 2, 0, vec![]).is_complete());
        let partial = BulkWriteResult::new(
            1,
            1,
            0,
            vec![(1, VitrineError::new("boom", ErrorKind::StoreError))],
        );
        assert!(!partial.is_complete());
        assert_eq!(partial.failures()[0].0, 1);
    }
}
