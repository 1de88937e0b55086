use crate::cascade::ReferenceCleanup;
use crate::collection::{BulkWriteResult, FindOptions, RecordId, Update, UpdateOptions, WriteModel};
use crate::common::{Value, ORDER, PARENT};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::filter::{all, by_id, field, Filter};
use crate::query::parse_sort;
use crate::repository::{Hierarchical, IdRef, Repository};
use crate::tree::{build_tree, descendants_of, TreeNode};
use itertools::Itertools;
use std::collections::HashSet;

/// A record with its ancestor chain, root first.
#[derive(Debug, Clone, PartialEq)]
pub struct Breadcrumb<T> {
    /// Ancestors followed by the record itself.
    pub trail: Vec<T>,
    /// Slugs of the trail joined with `/`.
    pub path: String,
}

/// Tree operations over a collection of [Hierarchical] records.
///
/// Reparenting is guarded by an ancestor walk so the parent graph stays a forest.
/// Deleting a node hands its children to its former parent in one batched write
/// and then strips the node's id from every referencing collection.
#[derive(Clone)]
pub struct HierarchyEngine<T: Hierarchical> {
    repository: Repository<T>,
    cleanup: ReferenceCleanup,
}

impl<T: Hierarchical> HierarchyEngine<T> {
    pub fn new(repository: Repository<T>, cleanup: ReferenceCleanup) -> Self {
        HierarchyEngine {
            repository,
            cleanup,
        }
    }

    pub fn repository(&self) -> &Repository<T> {
        &self.repository
    }

    /// Forest of every record matching `filter`.
    pub async fn tree(&self, filter: Filter) -> VitrineResult<Vec<TreeNode<T>>> {
        let records = self.repository.find_all(filter, FindOptions::new()).await?;
        Ok(build_tree(records))
    }

    /// Ancestors of a record, root first. The record itself is not included.
    ///
    /// # Errors
    ///
    /// `NotFound` when the record does not exist.
    pub async fn ancestors<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Vec<T>> {
        let record = self.require(id).await?;
        self.ancestors_of(&record).await
    }

    /// The record with its ancestors and the slug path, e.g. `lasers/ipl`.
    pub async fn breadcrumb<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Breadcrumb<T>> {
        let record = self.require(id).await?;
        let mut trail = self.ancestors_of(&record).await?;
        trail.push(record);
        let path = trail.iter().map(|r| r.slug()).join("/");
        Ok(Breadcrumb { trail, path })
    }

    /// Direct children ordered by `(order, name)`.
    pub async fn children<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Vec<T>> {
        let id = match id.into().resolve()? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        self.repository
            .find_all(field(PARENT).eq(id), sibling_options()?)
            .await
    }

    /// Records without a parent, ordered by `(order, name)`.
    pub async fn roots(&self) -> VitrineResult<Vec<T>> {
        self.repository
            .find_all(field(PARENT).eq(Value::Null), sibling_options()?)
            .await
    }

    /// Ids of every record below the given one, at any depth.
    pub async fn descendant_ids<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Vec<RecordId>> {
        let id = match id.into().resolve()? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let records = self
            .repository
            .find_all(all(), FindOptions::new())
            .await?;
        Ok(descendants_of(&records, id))
    }

    /// Checks that `node` may be placed under `new_parent`.
    ///
    /// Walks from `new_parent` up to its root. The walk stops at the first id seen
    /// twice, so an already corrupted chain cannot loop forever.
    ///
    /// # Errors
    ///
    /// * `CycleDetected` when `new_parent` is `node` or one of its descendants
    /// * `NotFound` when `new_parent` does not exist
    pub async fn check_cycle(&self, node: RecordId, new_parent: RecordId) -> VitrineResult<()> {
        if node == new_parent {
            return Err(cycle_error::<T>());
        }

        let mut visited = HashSet::new();
        let mut current = Some(new_parent);
        while let Some(id) = current {
            if id == node {
                return Err(cycle_error::<T>());
            }
            if !visited.insert(id) {
                log::warn!("Parent chain of {} {} already loops at {}", T::entity_name(), new_parent, id);
                return Ok(());
            }
            current = match self.repository.find_by_id(id).await? {
                Some(record) => record.parent(),
                None if id == new_parent => {
                    return Err(VitrineError::new(
                        &format!("Parent {} not found", T::entity_name()),
                        ErrorKind::NotFound,
                    ))
                }
                None => None,
            };
        }
        Ok(())
    }

    /// Moves a record under `new_parent`, or to the root level for `None`.
    ///
    /// Nothing is written when the move is rejected.
    pub async fn move_node<I: Into<IdRef>>(&self, id: I, new_parent: Option<RecordId>) -> VitrineResult<T> {
        let record = self.require(id).await?;
        let record_id = self.record_id(&record)?;
        if let Some(parent) = new_parent {
            self.check_cycle(record_id, parent).await?;
        }

        self.repository
            .update_by_id(record_id, Update::new().set(PARENT, new_parent), UpdateOptions::default())
            .await?
            .ok_or_else(|| not_found::<T>())
    }

    /// Deletes a record without orphaning its children.
    ///
    /// 1. every child is moved to the deleted record's parent (or to the root level)
    ///    with one batched write
    /// 2. the record is deleted
    /// 3. the moved children are checked again for cycles; a hit is logged
    /// 4. references to the record are cleaned up
    ///
    /// Returns `None` when the record does not exist, in which case nothing is
    /// written. A cleanup failure surfaces as `PartialWrite` after the delete went
    /// through; running the delete again is safe.
    pub async fn delete_and_reparent<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<T>> {
        let record = match self.repository.find_by_id(id).await? {
            Some(record) => record,
            None => return Ok(None),
        };
        let record_id = self.record_id(&record)?;
        let new_parent = record.parent();

        let moved = self
            .repository
            .find_all(field(PARENT).eq(record_id), FindOptions::new())
            .await?
            .iter()
            .filter_map(|child| child.id())
            .collect::<Vec<_>>();

        if !moved.is_empty() {
            let result = self
                .repository
                .update_many(field(PARENT).eq(record_id), Update::new().set(PARENT, new_parent))
                .await?;
            log::debug!(
                "Moved {} child(ren) of {} {} to {:?}",
                result.modified_count(),
                T::entity_name(),
                record_id,
                new_parent
            );
        }

        let deleted = self.repository.delete_by_id(record_id).await?;

        if let Some(parent) = new_parent {
            for child in &moved {
                if let Err(e) = self.check_cycle(*child, parent).await {
                    if e.kind() == &ErrorKind::CycleDetected {
                        log::error!(
                            "{} {} is its own ancestor after reparenting to {}",
                            T::entity_name(),
                            child,
                            parent
                        );
                    }
                }
            }
        }

        self.cleanup.run(record_id).await?;
        Ok(deleted)
    }

    /// Applies new sibling positions as one unordered batch of point updates.
    ///
    /// Unknown ids are skipped. An empty list writes nothing.
    ///
    /// # Errors
    ///
    /// `PartialWrite` when some updates failed; the whole list can be re-applied.
    pub async fn bulk_reorder(&self, positions: &[(RecordId, i64)]) -> VitrineResult<BulkWriteResult> {
        if positions.is_empty() {
            return Ok(BulkWriteResult::default());
        }

        let models = positions
            .iter()
            .map(|(id, order)| WriteModel::UpdateOne {
                filter: by_id(*id),
                update: Update::new().set(ORDER, *order),
            })
            .collect();
        let result = self.repository.bulk_write(models).await?;
        if result.is_complete() {
            return Ok(result);
        }

        let message = format!(
            "{} of {} reorder update(s) failed",
            result.failures().len(),
            positions.len()
        );
        Err(match result.failures().first() {
            Some((_, cause)) => VitrineError::new_with_cause(&message, ErrorKind::PartialWrite, cause.clone()),
            None => VitrineError::new(&message, ErrorKind::PartialWrite),
        })
    }

    async fn require<I: Into<IdRef>>(&self, id: I) -> VitrineResult<T> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<T>())
    }

    fn record_id(&self, record: &T) -> VitrineResult<RecordId> {
        record.id().ok_or_else(|| {
            VitrineError::new(
                &format!("Stored {} has no id", T::entity_name()),
                ErrorKind::InternalError,
            )
        })
    }

    async fn ancestors_of(&self, record: &T) -> VitrineResult<Vec<T>> {
        let mut chain = Vec::new();
        let mut visited: HashSet<RecordId> = record.id().into_iter().collect();
        let mut current = record.parent();
        while let Some(id) = current {
            if !visited.insert(id) {
                log::error!("Ancestor chain of {} loops at {}", T::entity_name(), id);
                break;
            }
            match self.repository.find_by_id(id).await? {
                Some(parent) => {
                    current = parent.parent();
                    chain.push(parent);
                }
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }
}

fn sibling_options() -> VitrineResult<FindOptions> {
    Ok(FindOptions::new().sort(parse_sort("order,name")?))
}

fn cycle_error<T: Hierarchical>() -> VitrineError {
    VitrineError::new(
        &format!("A {} cannot be moved under itself or its descendants", T::entity_name()),
        ErrorKind::CycleDetected,
    )
}

fn not_found<T: Hierarchical>() -> VitrineError {
    VitrineError::new(&format!("{} not found", T::entity_name()), ErrorKind::NotFound)
}
