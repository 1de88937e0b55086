//! Capabilities an [Entity] can opt into, and the repository operations each one
//! unlocks.
//!
//! Specialized repositories are built by composing these: a taxonomy category is
//! [Hierarchical] (and therefore [Sluggable]), a product is [Sluggable],
//! [Publishable] and [Categorized].

use crate::collection::{FindOptions, RecordId, Update, UpdateOperation, UpdateOptions};
use crate::common::{
    now, CATEGORIES, DOC_ID, FIRST_PUBLISHED_AT, PUBLISH_STATE, SLUG, TAGS,
};
use crate::entities::PublishState;
use crate::errors::{FieldError, VitrineError, VitrineResult};
use crate::filter::{and, field, or, Filter};
use crate::query::{parse_sort, with_id_tiebreaker, PageRequest, Paginated};
use crate::repository::{Entity, IdRef, Repository};
use chrono::{DateTime, Utc};

/// A record addressable by a unique, lowercase slug.
pub trait Sluggable: Entity {
    fn slug(&self) -> &str;
}

/// A node of a category forest.
pub trait Hierarchical: Sluggable {
    fn name(&self) -> &str;

    /// `None` for roots.
    fn parent(&self) -> Option<RecordId>;

    /// Position among siblings, ascending.
    fn order(&self) -> i64;
}

/// A record moving through the draft/private/published state machine.
pub trait Publishable: Entity {
    fn publish_state(&self) -> PublishState;

    fn first_published_at(&self) -> Option<DateTime<Utc>>;

    /// Filter selecting the records the public may see.
    fn published_filter() -> Filter {
        field(PUBLISH_STATE).eq(PublishState::Published)
    }
}

/// A record referencing categories and carrying free-form tags.
pub trait Categorized: Entity {
    fn categories(&self) -> &[RecordId];

    fn tags(&self) -> &[String];
}

/// Canonical stored form of a slug.
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}

impl<T: Sluggable> Repository<T> {
    /// Looks a record up by slug, ignoring case.
    pub async fn find_by_slug(&self, slug: &str) -> VitrineResult<Option<T>> {
        self.find_one(field(SLUG).eq(normalize_slug(slug))).await
    }

    /// Whether another record already uses `slug`.
    ///
    /// The record identified by `exclude` never counts as a conflict, so an edit
    /// form can keep its own slug.
    pub async fn slug_exists<I: Into<IdRef>>(&self, slug: &str, exclude: I) -> VitrineResult<bool> {
        let mut filter = field(SLUG).eq(normalize_slug(slug));
        if let Some(id) = exclude.into().resolve()? {
            filter = filter.and(field(DOC_ID).ne(id));
        }
        self.exists(filter).await
    }
}

/// Rejects direct writes to `first_published_at` and stamps it when `update`
/// publishes the record.
pub(crate) fn guard_publish_update(update: Update) -> VitrineResult<Update> {
    if update
        .operations()
        .iter()
        .any(|op| op.field() == FIRST_PUBLISHED_AT)
    {
        return Err(VitrineError::validation(vec![FieldError::new(
            FIRST_PUBLISHED_AT,
            "first_published_at is set on first publication and cannot be changed",
        )]));
    }

    let publishes = update.operations().iter().any(|op| match op {
        UpdateOperation::Set(f, v) | UpdateOperation::SetIfAbsent(f, v) if f == PUBLISH_STATE => {
            v.as_str().and_then(PublishState::parse) == Some(PublishState::Published)
        }
        _ => false,
    });
    if publishes {
        Ok(update.set_if_absent(FIRST_PUBLISHED_AT, now()))
    } else {
        Ok(update)
    }
}

impl<T: Publishable> Repository<T> {
    /// Moves a record to `state`.
    ///
    /// Entering `published` stamps `first_published_at` in the same atomic update,
    /// only when it is still unset. Repeating the call leaves the stamp alone.
    pub async fn set_publish_state<I: Into<IdRef>>(
        &self,
        id: I,
        state: PublishState,
    ) -> VitrineResult<Option<T>> {
        let mut update = Update::new().set(PUBLISH_STATE, state);
        if state == PublishState::Published {
            update = update.set_if_absent(FIRST_PUBLISHED_AT, now());
        }
        self.update_by_id(id, update, UpdateOptions::default()).await
    }

    /// Applies a caller-supplied patch to a publishable record.
    ///
    /// `first_published_at` is owned by the publish transition and cannot be
    /// touched directly. A patch moving the record to `published` gets the same
    /// stamp as [Repository::set_publish_state].
    pub async fn update_publishable<I: Into<IdRef>>(
        &self,
        id: I,
        update: Update,
    ) -> VitrineResult<Option<T>> {
        let update = guard_publish_update(update)?;
        self.update_by_id(id, update, UpdateOptions::default()).await
    }

    /// Paginated public view: `filter` narrowed to published records.
    pub async fn find_published(
        &self,
        filter: Filter,
        page: u64,
        limit: Option<u64>,
        sort: Option<&str>,
    ) -> VitrineResult<Paginated<T>> {
        self.find_paginated(and(vec![filter, T::published_filter()]), page, limit, sort)
            .await
    }
}

impl<T: Categorized + Publishable> Repository<T> {
    /// Up to `limit` published records sharing a category or a tag with the given
    /// record, newest first. The record itself is excluded.
    ///
    /// `limit` defaults to the configured related limit. An unknown id or a record
    /// with neither categories nor tags yields an empty list.
    pub async fn related<I: Into<IdRef>>(&self, id: I, limit: Option<u64>) -> VitrineResult<Vec<T>> {
        let record = match self.find_by_id(id).await? {
            Some(record) => record,
            None => return Ok(Vec::new()),
        };

        let mut shared = Vec::new();
        if !record.categories().is_empty() {
            shared.push(field(CATEGORIES).in_values(record.categories().to_vec()));
        }
        if !record.tags().is_empty() {
            shared.push(field(TAGS).in_values(record.tags().to_vec()));
        }
        if shared.is_empty() {
            return Ok(Vec::new());
        }

        let mut filter = vec![T::published_filter(), or(shared)];
        if let Some(id) = record.id() {
            filter.push(field(DOC_ID).ne(id));
        }

        let limit = limit
            .unwrap_or_else(|| self.config().related_limit())
            .clamp(1, self.config().max_page_limit());
        let options = FindOptions::new()
            .sort(with_id_tiebreaker(parse_sort("-created_at")?))
            .limit(limit);
        self.find_all(and(filter), options).await
    }

    /// Published records filed under a category.
    pub async fn by_category<I: Into<IdRef>>(
        &self,
        category: I,
        page: u64,
        limit: Option<u64>,
        sort: Option<&str>,
    ) -> VitrineResult<Paginated<T>> {
        let filter = match category.into().resolve()? {
            Some(id) => field(CATEGORIES).eq(id),
            None => {
                let request = PageRequest::from_config(page, limit, self.config());
                return Ok(Paginated::empty(request));
            }
        };
        self.find_published(filter, page, limit, sort).await
    }

    /// Published records carrying `tag`.
    pub async fn by_tag(
        &self,
        tag: &str,
        page: u64,
        limit: Option<u64>,
        sort: Option<&str>,
    ) -> VitrineResult<Paginated<T>> {
        self.find_published(field(TAGS).eq(tag.trim()), page, limit, sort)
            .await
    }
}
