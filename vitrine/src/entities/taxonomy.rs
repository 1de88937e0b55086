use crate::cascade::{Reference, ReferenceCleanup};
use crate::collection::{BulkWriteResult, Document, RecordId, Update, UpdateOperation, UpdateOptions};
use crate::common::{
    Convertible, Value, CATEGORIES, DOC_CREATED_AT, DOC_ID, DOC_UPDATED_AT, NAME, ORDER, PARENT,
    PRIMARY_CATEGORY,
};
use crate::connection::Connection;
use crate::entities::{slug_rule, Article, Product};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::filter::{all, field, Filter};
use crate::repository::{
    expect_document, put_optional, Entity, FieldRule, Hierarchical, IdRef, Repository, Schema,
    Sluggable,
};
use crate::tree::{Breadcrumb, HierarchyEngine, TreeNode};
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::marker::PhantomData;

const IS_ACTIVE: &str = "is_active";
const DESCRIPTION: &str = "description";

/// Distinguishes the independent category forests sharing one record shape.
pub trait TaxonomyKind: Debug + Clone + PartialEq + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const ENTITY: &'static str;

    /// Fields in other collections that hold ids of this taxonomy.
    fn references() -> Vec<Reference>;
}

/// Catalog categories, referenced by products.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTaxonomy;

impl TaxonomyKind for ProductTaxonomy {
    const COLLECTION: &'static str = "categories";
    const ENTITY: &'static str = "Category";

    fn references() -> Vec<Reference> {
        vec![
            Reference::array(Product::collection_name(), CATEGORIES),
            Reference::scalar(Product::collection_name(), PRIMARY_CATEGORY),
        ]
    }
}

/// Blog categories, referenced by articles.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogTaxonomy;

impl TaxonomyKind for BlogTaxonomy {
    const COLLECTION: &'static str = "blog_categories";
    const ENTITY: &'static str = "BlogCategory";

    fn references() -> Vec<Reference> {
        vec![
            Reference::array(Article::collection_name(), CATEGORIES),
            Reference::scalar(Article::collection_name(), PRIMARY_CATEGORY),
        ]
    }
}

/// A node of a category forest.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy<K: TaxonomyKind> {
    pub id: Option<RecordId>,
    pub name: String,
    pub slug: String,
    pub parent: Option<RecordId>,
    pub order: i64,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    kind: PhantomData<K>,
}

pub type Category = Taxonomy<ProductTaxonomy>;
pub type BlogCategory = Taxonomy<BlogTaxonomy>;

impl<K: TaxonomyKind> Taxonomy<K> {
    /// A new active root at position 0.
    pub fn new(name: &str, slug: &str) -> Self {
        Taxonomy {
            id: None,
            name: name.to_string(),
            slug: slug.to_string(),
            parent: None,
            order: 0,
            is_active: true,
            description: None,
            created_at: None,
            updated_at: None,
            kind: PhantomData,
        }
    }

    pub fn with_parent(mut self, parent: Option<RecordId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl<K: TaxonomyKind> Convertible for Taxonomy<K> {
    type Output = Self;

    fn to_value(&self) -> VitrineResult<Value> {
        let mut doc = Document::new();
        put_optional(&mut doc, DOC_ID, self.id)?;
        doc.put(NAME, self.name.as_str())?;
        doc.put("slug", self.slug.as_str())?;
        put_optional(&mut doc, PARENT, self.parent)?;
        doc.put(ORDER, self.order)?;
        doc.put(IS_ACTIVE, self.is_active)?;
        put_optional(&mut doc, DESCRIPTION, self.description.as_deref())?;
        put_optional(&mut doc, DOC_CREATED_AT, self.created_at)?;
        put_optional(&mut doc, DOC_UPDATED_AT, self.updated_at)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> VitrineResult<Self> {
        let doc = expect_document(value, K::ENTITY)?;
        Ok(Taxonomy {
            id: doc.id(),
            name: doc.get_as(NAME)?,
            slug: doc.get_as("slug")?,
            parent: doc.get_as(PARENT)?,
            order: doc.get_as::<Option<i64>>(ORDER)?.unwrap_or_default(),
            is_active: doc.get_as::<Option<bool>>(IS_ACTIVE)?.unwrap_or(true),
            description: doc.get_as(DESCRIPTION)?,
            created_at: doc.get_as(DOC_CREATED_AT)?,
            updated_at: doc.get_as(DOC_UPDATED_AT)?,
            kind: PhantomData,
        })
    }
}

impl<K: TaxonomyKind> Entity for Taxonomy<K> {
    fn collection_name() -> &'static str {
        K::COLLECTION
    }

    fn entity_name() -> &'static str {
        K::ENTITY
    }

    fn schema() -> Schema {
        Schema::new()
            .field(NAME, FieldRule::string().label("Name").required().max_length(100))
            .field("slug", slug_rule())
            .field(PARENT, FieldRule::id().label("Parent"))
            .field(ORDER, FieldRule::int().label("Order"))
            .field(IS_ACTIVE, FieldRule::bool())
            .field(DESCRIPTION, FieldRule::string().label("Description").max_length(500))
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl<K: TaxonomyKind> Sluggable for Taxonomy<K> {
    fn slug(&self) -> &str {
        &self.slug
    }
}

impl<K: TaxonomyKind> Hierarchical for Taxonomy<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    fn order(&self) -> i64 {
        self.order
    }
}

/// Active and inactive node counts of one taxonomy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxonomyStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

/// Repository for one category forest.
///
/// Every write keeps the parent graph a forest: a new node's parent must exist, a
/// reparenting update is cycle-checked first, and deleting a node hands its
/// children to its own parent before references to it are cleaned up.
#[derive(Clone)]
pub struct TaxonomyRepository<K: TaxonomyKind> {
    engine: HierarchyEngine<Taxonomy<K>>,
}

pub type CategoryRepository = TaxonomyRepository<ProductTaxonomy>;
pub type BlogCategoryRepository = TaxonomyRepository<BlogTaxonomy>;

impl<K: TaxonomyKind> TaxonomyRepository<K> {
    pub fn new(connection: Connection) -> Self {
        let cleanup = ReferenceCleanup::new(connection.clone(), K::references());
        TaxonomyRepository {
            engine: HierarchyEngine::new(Repository::new(connection), cleanup),
        }
    }

    pub fn repository(&self) -> &Repository<Taxonomy<K>> {
        self.engine.repository()
    }

    pub fn engine(&self) -> &HierarchyEngine<Taxonomy<K>> {
        &self.engine
    }

    /// Creates a node.
    ///
    /// # Errors
    ///
    /// `NotFound` when the parent does not exist, plus the usual validation and
    /// duplicate-slug errors.
    pub async fn create(&self, category: Taxonomy<K>) -> VitrineResult<Taxonomy<K>> {
        if let Some(parent) = category.parent {
            if self.repository().find_by_id(parent).await?.is_none() {
                return Err(VitrineError::new(
                    &format!("Parent {} not found", K::ENTITY),
                    ErrorKind::NotFound,
                ));
            }
        }
        self.repository().create(category).await
    }

    /// Patches a node. A new parent is cycle-checked before anything is written.
    pub async fn update<I: Into<IdRef>>(&self, id: I, update: Update) -> VitrineResult<Option<Taxonomy<K>>> {
        let id = match id.into().resolve()? {
            Some(id) => id,
            None => return Ok(None),
        };
        if let Some(parent) = new_parent(&update)? {
            self.engine.check_cycle(id, parent).await?;
        }
        self.repository()
            .update_by_id(id, update, UpdateOptions::default())
            .await
    }

    pub async fn find_by_id<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Taxonomy<K>>> {
        self.repository().find_by_id(id).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> VitrineResult<Option<Taxonomy<K>>> {
        self.repository().find_by_slug(slug).await
    }

    pub async fn slug_exists<I: Into<IdRef>>(&self, slug: &str, exclude: I) -> VitrineResult<bool> {
        self.repository().slug_exists(slug, exclude).await
    }

    /// The whole forest, or only its active nodes.
    pub async fn get_tree(&self, active_only: bool) -> VitrineResult<Vec<TreeNode<Taxonomy<K>>>> {
        let filter = if active_only {
            field(IS_ACTIVE).eq(true)
        } else {
            all()
        };
        self.engine.tree(filter).await
    }

    pub async fn breadcrumb<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Breadcrumb<Taxonomy<K>>> {
        self.engine.breadcrumb(id).await
    }

    pub async fn ancestors<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Vec<Taxonomy<K>>> {
        self.engine.ancestors(id).await
    }

    pub async fn children<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Vec<Taxonomy<K>>> {
        self.engine.children(id).await
    }

    pub async fn roots(&self) -> VitrineResult<Vec<Taxonomy<K>>> {
        self.engine.roots().await
    }

    pub async fn move_node<I: Into<IdRef>>(&self, id: I, parent: Option<RecordId>) -> VitrineResult<Taxonomy<K>> {
        self.engine.move_node(id, parent).await
    }

    /// Deletes a node, reparenting its children and cleaning up references.
    pub async fn delete<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Taxonomy<K>>> {
        self.engine.delete_and_reparent(id).await
    }

    pub async fn reorder(&self, positions: &[(RecordId, i64)]) -> VitrineResult<BulkWriteResult> {
        self.engine.bulk_reorder(positions).await
    }

    /// Node counts by active flag, in one aggregation pass.
    pub async fn stats(&self, filter: Filter) -> VitrineResult<TaxonomyStats> {
        let groups = self.repository().count_by(filter, IS_ACTIVE).await?;
        let mut stats = TaxonomyStats::default();
        for (value, count) in groups {
            stats.total += count;
            match value {
                Value::Bool(false) => stats.inactive += count,
                // a missing flag reads as active
                _ => stats.active += count,
            }
        }
        Ok(stats)
    }
}

/// The parent an update assigns, if it assigns a non-null one.
fn new_parent(update: &Update) -> VitrineResult<Option<RecordId>> {
    let value = update.operations().iter().rev().find_map(|op| match op {
        UpdateOperation::Set(f, value) | UpdateOperation::SetIfAbsent(f, value) if f == PARENT => {
            Some(value)
        }
        _ => None,
    });
    match value {
        Some(Value::Id(id)) => Ok(Some(*id)),
        Some(Value::String(raw)) => RecordId::parse(raw.trim()).map(Some),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(VitrineError::cast(PARENT, "Id")),
    }
}
