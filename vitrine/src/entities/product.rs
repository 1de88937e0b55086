use crate::collection::{Document, RecordId, Update};
use crate::common::{
    now, Convertible, Value, CATEGORIES, DOC_CREATED_AT, DOC_ID, DOC_UPDATED_AT,
    FIRST_PUBLISHED_AT, PRIMARY_CATEGORY, PUBLISH_STATE, SLUG, TAGS,
};
use crate::connection::Connection;
use crate::entities::{slug_rule, tally, PublishState, Visibility};
use crate::errors::VitrineResult;
use crate::filter::{and, field, Filter};
use crate::query::{FilterComposer, Paginated};
use crate::repository::{
    expect_document, put_optional, Categorized, Entity, FieldKind, FieldRule, IdRef, Publishable,
    Repository, Schema, Sluggable,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const VISIBILITY: &str = "visibility";
const TREATMENTS: &str = "treatments";
const CERTIFICATIONS: &str = "certifications";

/// A catalog item.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Option<RecordId>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub categories: Vec<RecordId>,
    pub primary_category: Option<RecordId>,
    pub publish_state: PublishState,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub treatments: Vec<String>,
    pub certifications: Vec<String>,
    pub first_published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// A public draft without categories.
    pub fn new(title: &str, slug: &str) -> Self {
        Product {
            id: None,
            title: title.to_string(),
            slug: slug.to_string(),
            description: None,
            categories: Vec::new(),
            primary_category: None,
            publish_state: PublishState::Draft,
            visibility: Visibility::Public,
            tags: Vec::new(),
            treatments: Vec::new(),
            certifications: Vec::new(),
            first_published_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Files the product under `categories`; the first one becomes primary.
    pub fn with_categories(mut self, categories: Vec<RecordId>) -> Self {
        self.primary_category = categories.first().copied();
        self.categories = categories;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = to_strings(tags);
        self
    }

    pub fn with_treatments(mut self, treatments: &[&str]) -> Self {
        self.treatments = to_strings(treatments);
        self
    }

    pub fn with_certifications(mut self, certifications: &[&str]) -> Self {
        self.certifications = to_strings(certifications);
        self
    }

    pub fn with_state(mut self, state: PublishState) -> Self {
        self.publish_state = state;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

pub(crate) fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Convertible for Product {
    type Output = Product;

    fn to_value(&self) -> VitrineResult<Value> {
        let mut doc = Document::new();
        put_optional(&mut doc, DOC_ID, self.id)?;
        doc.put(TITLE, self.title.as_str())?;
        doc.put(SLUG, self.slug.as_str())?;
        put_optional(&mut doc, DESCRIPTION, self.description.as_deref())?;
        doc.put(CATEGORIES, self.categories.to_value()?)?;
        put_optional(&mut doc, PRIMARY_CATEGORY, self.primary_category)?;
        doc.put(PUBLISH_STATE, self.publish_state)?;
        doc.put(VISIBILITY, self.visibility)?;
        doc.put(TAGS, self.tags.to_value()?)?;
        doc.put(TREATMENTS, self.treatments.to_value()?)?;
        doc.put(CERTIFICATIONS, self.certifications.to_value()?)?;
        put_optional(&mut doc, FIRST_PUBLISHED_AT, self.first_published_at)?;
        put_optional(&mut doc, DOC_CREATED_AT, self.created_at)?;
        put_optional(&mut doc, DOC_UPDATED_AT, self.updated_at)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> VitrineResult<Self::Output> {
        let doc = expect_document(value, "Product")?;
        Ok(Product {
            id: doc.id(),
            title: doc.get_as(TITLE)?,
            slug: doc.get_as(SLUG)?,
            description: doc.get_as(DESCRIPTION)?,
            categories: doc.get_as(CATEGORIES)?,
            primary_category: doc.get_as(PRIMARY_CATEGORY)?,
            publish_state: doc.get_as(PUBLISH_STATE)?,
            visibility: doc
                .get_as::<Option<Visibility>>(VISIBILITY)?
                .unwrap_or_default(),
            tags: doc.get_as(TAGS)?,
            treatments: doc.get_as(TREATMENTS)?,
            certifications: doc.get_as(CERTIFICATIONS)?,
            first_published_at: doc.get_as(FIRST_PUBLISHED_AT)?,
            created_at: doc.get_as(DOC_CREATED_AT)?,
            updated_at: doc.get_as(DOC_UPDATED_AT)?,
        })
    }
}

impl Entity for Product {
    fn collection_name() -> &'static str {
        "products"
    }

    fn entity_name() -> &'static str {
        "Product"
    }

    fn schema() -> Schema {
        Schema::new()
            .field(TITLE, FieldRule::string().label("Title").required().max_length(200))
            .field(SLUG, slug_rule())
            .field(DESCRIPTION, FieldRule::string().label("Description").max_length(5000))
            .field(CATEGORIES, FieldRule::array_of(FieldKind::Id))
            .field(PRIMARY_CATEGORY, FieldRule::id())
            .field(
                PUBLISH_STATE,
                FieldRule::string()
                    .label("Publish state")
                    .required()
                    .lowercase()
                    .one_of(&PublishState::names()),
            )
            .field(
                VISIBILITY,
                FieldRule::string()
                    .label("Visibility")
                    .lowercase()
                    .one_of(&Visibility::names()),
            )
            .field(TAGS, FieldRule::array_of(FieldKind::String))
            .field(TREATMENTS, FieldRule::array_of(FieldKind::String))
            .field(CERTIFICATIONS, FieldRule::array_of(FieldKind::String))
            .field(FIRST_PUBLISHED_AT, FieldRule::datetime())
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Sluggable for Product {
    fn slug(&self) -> &str {
        &self.slug
    }
}

impl Publishable for Product {
    fn publish_state(&self) -> PublishState {
        self.publish_state
    }

    fn first_published_at(&self) -> Option<DateTime<Utc>> {
        self.first_published_at
    }

    /// Published and publicly visible.
    fn published_filter() -> Filter {
        and(vec![
            field(PUBLISH_STATE).eq(PublishState::Published),
            field(VISIBILITY).eq(Visibility::Public),
        ])
    }
}

impl Categorized for Product {
    fn categories(&self) -> &[RecordId] {
        &self.categories
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Optional search dimensions for product listings. Unset dimensions do not
/// narrow the result.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Literal substring of the title or description.
    pub search: Option<String>,
    pub categories: Option<Vec<RecordId>>,
    pub tags: Option<Vec<String>>,
    pub publish_state: Option<PublishState>,
    pub visibility: Option<Visibility>,
    pub treatments: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    /// 1-based page.
    pub page: u64,
    pub limit: Option<u64>,
    /// Sort string such as `-created_at,title`.
    pub sort: Option<String>,
}

impl ProductQuery {
    fn to_filter(&self) -> VitrineResult<Filter> {
        FilterComposer::new()
            .search(self.search.as_deref(), &[TITLE, DESCRIPTION])
            .any_of(CATEGORIES, self.categories.clone())
            .any_of(TAGS, self.tags.clone())
            .eq(PUBLISH_STATE, self.publish_state)
            .eq(VISIBILITY, self.visibility)
            .any_of(TREATMENTS, self.treatments.clone())
            .any_of(CERTIFICATIONS, self.certifications.clone())
            .build()
    }
}

/// Product counts per publish state and per visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductStats {
    pub total: u64,
    pub by_state: BTreeMap<PublishState, u64>,
    pub by_visibility: BTreeMap<Visibility, u64>,
}

/// Catalog repository: filtered listings, the public view, related items and the
/// publish-state machine.
#[derive(Clone)]
pub struct ProductRepository {
    repository: Repository<Product>,
}

impl ProductRepository {
    pub fn new(connection: Connection) -> Self {
        ProductRepository {
            repository: Repository::new(connection),
        }
    }

    pub fn repository(&self) -> &Repository<Product> {
        &self.repository
    }

    /// Creates a product, stamping `first_published_at` when it starts published.
    pub async fn create(&self, mut product: Product) -> VitrineResult<Product> {
        if product.publish_state == PublishState::Published && product.first_published_at.is_none() {
            product.first_published_at = Some(now());
        }
        self.repository.create(product).await
    }

    /// Patches a product. Publishing through a patch stamps the first publication
    /// like [ProductRepository::set_publish_state]; direct writes to the stamp are
    /// rejected.
    pub async fn update<I: Into<IdRef>>(&self, id: I, update: Update) -> VitrineResult<Option<Product>> {
        self.repository.update_publishable(id, update).await
    }

    pub async fn find_by_id<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Product>> {
        self.repository.find_by_id(id).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> VitrineResult<Option<Product>> {
        self.repository.find_by_slug(slug).await
    }

    pub async fn slug_exists<I: Into<IdRef>>(&self, slug: &str, exclude: I) -> VitrineResult<bool> {
        self.repository.slug_exists(slug, exclude).await
    }

    /// Admin listing over every product matching `query`.
    pub async fn find_with_filters(&self, query: &ProductQuery) -> VitrineResult<Paginated<Product>> {
        self.repository
            .find_paginated(query.to_filter()?, query.page, query.limit, query.sort.as_deref())
            .await
    }

    /// Public listing: like [ProductRepository::find_with_filters], restricted to
    /// published, public products.
    pub async fn find_published(&self, query: &ProductQuery) -> VitrineResult<Paginated<Product>> {
        self.repository
            .find_published(query.to_filter()?, query.page, query.limit, query.sort.as_deref())
            .await
    }

    pub async fn related<I: Into<IdRef>>(&self, id: I, limit: Option<u64>) -> VitrineResult<Vec<Product>> {
        self.repository.related(id, limit).await
    }

    pub async fn by_category<I: Into<IdRef>>(
        &self,
        category: I,
        page: u64,
        limit: Option<u64>,
    ) -> VitrineResult<Paginated<Product>> {
        self.repository.by_category(category, page, limit, None).await
    }

    pub async fn by_tag(&self, tag: &str, page: u64, limit: Option<u64>) -> VitrineResult<Paginated<Product>> {
        self.repository.by_tag(tag, page, limit, None).await
    }

    pub async fn set_publish_state<I: Into<IdRef>>(
        &self,
        id: I,
        state: PublishState,
    ) -> VitrineResult<Option<Product>> {
        self.repository.set_publish_state(id, state).await
    }

    pub async fn delete<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Product>> {
        self.repository.delete_by_id(id).await
    }

    /// Counts by publish state and by visibility, one aggregation pass each.
    pub async fn stats(&self) -> VitrineResult<ProductStats> {
        let (states, visibility) = tokio::try_join!(
            self.repository.count_by(Filter::All, PUBLISH_STATE),
            self.repository.count_by(Filter::All, VISIBILITY)
        )?;
        let by_state = tally(states, PublishState::ALL);
        Ok(ProductStats {
            total: by_state.values().sum(),
            by_state,
            by_visibility: tally(visibility, Visibility::ALL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn repository() -> ProductRepository {
        ProductRepository::new(Connection::in_memory())
    }

    #[tokio::test]
    async fn publishing_stamps_first_publication_once() {
        let products = repository();
        let product = products.create(Product::new("Laser", "laser")).await.unwrap();
        assert!(product.first_published_at.is_none());

        let published = products
            .set_publish_state(&product, PublishState::Published)
            .await
            .unwrap()
            .unwrap();
        let stamp = published.first_published_at.unwrap();

        products
            .set_publish_state(&product, PublishState::Draft)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let again = products
            .set_publish_state(&product, PublishState::Published)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.first_published_at, Some(stamp));
    }

    #[tokio::test]
    async fn created_published_is_stamped() {
        let products = repository();
        let product = products
            .create(Product::new("Laser", "laser").with_state(PublishState::Published))
            .await
            .unwrap();
        assert!(product.first_published_at.is_some());
    }

    #[tokio::test]
    async fn public_view_hides_restricted_and_unpublished() {
        let products = repository();
        products
            .create(Product::new("A", "a").with_state(PublishState::Published))
            .await
            .unwrap();
        products
            .create(
                Product::new("B", "b")
                    .with_state(PublishState::Published)
                    .with_visibility(Visibility::Restricted),
            )
            .await
            .unwrap();
        products.create(Product::new("C", "c")).await.unwrap();

        let page = products.find_published(&ProductQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].slug, "a");

        let all = products.find_with_filters(&ProductQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }

    #[tokio::test]
    async fn publishing_through_update_is_stamped() {
        let products = repository();
        let product = products.create(Product::new("Laser", "laser")).await.unwrap();

        let published = products
            .update(&product, Update::new().set(PUBLISH_STATE, PublishState::Published))
            .await
            .unwrap()
            .unwrap();
        let stamp = published.first_published_at.unwrap();

        let republished = products
            .update(
                &product,
                Update::new()
                    .set(PUBLISH_STATE, "Published")
                    .set("title", "Laser II"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(republished.first_published_at, Some(stamp));
        assert_eq!(republished.title, "Laser II");
    }

    #[tokio::test]
    async fn first_publication_stamp_cannot_be_patched() {
        let products = repository();
        let product = products
            .create(Product::new("Laser", "laser").with_state(PublishState::Published))
            .await
            .unwrap();
        let stamp = product.first_published_at;

        for update in [
            Update::new().unset(FIRST_PUBLISHED_AT),
            Update::new().set(FIRST_PUBLISHED_AT, now()),
            Update::new()
                .set(PUBLISH_STATE, PublishState::Draft)
                .set(FIRST_PUBLISHED_AT, Value::Null),
        ] {
            let err = products.update(&product, update).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert_eq!(err.field_errors()[0].field(), FIRST_PUBLISHED_AT);
        }

        let stored = products.find_by_id(&product).await.unwrap().unwrap();
        assert_eq!(stored.first_published_at, stamp);
        assert_eq!(stored.publish_state, PublishState::Published);
    }

    #[tokio::test]
    async fn invalid_state_is_rejected() {
        let products = repository();
        let product = products.create(Product::new("A", "a")).await.unwrap();
        let err = products
            .update(&product, Update::new().set(PUBLISH_STATE, "archived"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn stats_fill_every_state() {
        let products = repository();
        products
            .create(Product::new("A", "a").with_state(PublishState::Published))
            .await
            .unwrap();
        products.create(Product::new("B", "b")).await.unwrap();
        products.create(Product::new("C", "c")).await.unwrap();

        let stats = products.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_state[&PublishState::Draft], 2);
        assert_eq!(stats.by_state[&PublishState::Private], 0);
        assert_eq!(stats.by_state[&PublishState::Published], 1);
        assert_eq!(stats.by_visibility[&Visibility::Public], 3);
    }

    #[tokio::test]
    async fn related_shares_category_or_tag() {
        let products = repository();
        let lasers = RecordId::new();
        let skin = RecordId::new();
        let published = |p: Product| p.with_state(PublishState::Published);

        let source = products
            .create(published(Product::new("Source", "source")).with_categories(vec![lasers]).with_tags(&["ipl"]))
            .await
            .unwrap();
        products
            .create(published(Product::new("Same category", "same-category")).with_categories(vec![lasers]))
            .await
            .unwrap();
        products
            .create(published(Product::new("Same tag", "same-tag")).with_categories(vec![skin]).with_tags(&["ipl"]))
            .await
            .unwrap();
        products
            .create(published(Product::new("Unrelated", "unrelated")).with_categories(vec![skin]))
            .await
            .unwrap();
        products
            .create(Product::new("Draft", "draft").with_categories(vec![lasers]))
            .await
            .unwrap();

        let related = products.related(&source, None).await.unwrap();
        let slugs: Vec<&str> = related.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["same-tag", "same-category"]);

        let capped = products.related(&source, Some(1)).await.unwrap();
        assert_eq!(capped.len(), 1);

        let lonely = products.create(Product::new("Lonely", "lonely")).await.unwrap();
        assert!(products.related(&lonely, None).await.unwrap().is_empty());
        assert!(products.related(RecordId::new(), None).await.unwrap().is_empty());

        let by_category = products.by_category(lasers, 1, None).await.unwrap();
        assert_eq!(by_category.total, 2);
        let by_tag = products.by_tag("ipl", 1, None).await.unwrap();
        assert_eq!(by_tag.total, 2);
    }
}
