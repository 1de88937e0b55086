use crate::collection::{Document, RecordId, Update, UpdateOptions};
use crate::common::{
    now, Convertible, Value, CATEGORIES, DOC_CREATED_AT, DOC_ID, DOC_UPDATED_AT,
    FIRST_PUBLISHED_AT, PRIMARY_CATEGORY, PUBLISH_STATE, SLUG, TAGS,
};
use crate::connection::Connection;
use crate::entities::{slug_rule, tally, to_strings, PublishState};
use crate::errors::VitrineResult;
use crate::filter::{field, Filter};
use crate::query::{FilterComposer, Paginated};
use crate::repository::{
    expect_document, put_optional, Categorized, Entity, FieldKind, FieldRule, IdRef, Publishable,
    Repository, Schema, Sluggable,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const TITLE: &str = "title";
const EXCERPT: &str = "excerpt";
const CONTENT: &str = "content";
const AUTHOR: &str = "author";
const VIEW_COUNT: &str = "view_count";

/// A blog post.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: Option<RecordId>,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub author: String,
    pub categories: Vec<RecordId>,
    pub primary_category: Option<RecordId>,
    pub tags: Vec<String>,
    pub publish_state: PublishState,
    pub view_count: i64,
    pub first_published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(title: &str, slug: &str, author: &str) -> Self {
        Article {
            id: None,
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: None,
            content: String::new(),
            author: author.to_string(),
            categories: Vec::new(),
            primary_category: None,
            tags: Vec::new(),
            publish_state: PublishState::Draft,
            view_count: 0,
            first_published_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn with_excerpt(mut self, excerpt: &str) -> Self {
        self.excerpt = Some(excerpt.to_string());
        self
    }

    /// Files the article under `categories`; the first one becomes primary.
    pub fn with_categories(mut self, categories: Vec<RecordId>) -> Self {
        self.primary_category = categories.first().copied();
        self.categories = categories;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = to_strings(tags);
        self
    }

    pub fn with_state(mut self, state: PublishState) -> Self {
        self.publish_state = state;
        self
    }
}

impl Convertible for Article {
    type Output = Article;

    fn to_value(&self) -> VitrineResult<Value> {
        let mut doc = Document::new();
        put_optional(&mut doc, DOC_ID, self.id)?;
        doc.put(TITLE, self.title.as_str())?;
        doc.put(SLUG, self.slug.as_str())?;
        put_optional(&mut doc, EXCERPT, self.excerpt.as_deref())?;
        doc.put(CONTENT, self.content.as_str())?;
        doc.put(AUTHOR, self.author.as_str())?;
        doc.put(CATEGORIES, self.categories.to_value()?)?;
        put_optional(&mut doc, PRIMARY_CATEGORY, self.primary_category)?;
        doc.put(TAGS, self.tags.to_value()?)?;
        doc.put(PUBLISH_STATE, self.publish_state)?;
        doc.put(VIEW_COUNT, self.view_count)?;
        put_optional(&mut doc, FIRST_PUBLISHED_AT, self.first_published_at)?;
        put_optional(&mut doc, DOC_CREATED_AT, self.created_at)?;
        put_optional(&mut doc, DOC_UPDATED_AT, self.updated_at)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> VitrineResult<Self::Output> {
        let doc = expect_document(value, "Article")?;
        Ok(Article {
            id: doc.id(),
            title: doc.get_as(TITLE)?,
            slug: doc.get_as(SLUG)?,
            excerpt: doc.get_as(EXCERPT)?,
            content: doc.get_as::<Option<String>>(CONTENT)?.unwrap_or_default(),
            author: doc.get_as(AUTHOR)?,
            categories: doc.get_as(CATEGORIES)?,
            primary_category: doc.get_as(PRIMARY_CATEGORY)?,
            tags: doc.get_as(TAGS)?,
            publish_state: doc.get_as(PUBLISH_STATE)?,
            view_count: doc.get_as::<Option<i64>>(VIEW_COUNT)?.unwrap_or_default(),
            first_published_at: doc.get_as(FIRST_PUBLISHED_AT)?,
            created_at: doc.get_as(DOC_CREATED_AT)?,
            updated_at: doc.get_as(DOC_UPDATED_AT)?,
        })
    }
}

impl Entity for Article {
    fn collection_name() -> &'static str {
        "articles"
    }

    fn entity_name() -> &'static str {
        "Article"
    }

    fn schema() -> Schema {
        Schema::new()
            .field(TITLE, FieldRule::string().label("Title").required().max_length(200))
            .field(SLUG, slug_rule())
            .field(EXCERPT, FieldRule::string().label("Excerpt").max_length(500))
            .field(CONTENT, FieldRule::string())
            .field(AUTHOR, FieldRule::string().label("Author").required().max_length(100))
            .field(CATEGORIES, FieldRule::array_of(FieldKind::Id))
            .field(PRIMARY_CATEGORY, FieldRule::id())
            .field(TAGS, FieldRule::array_of(FieldKind::String))
            .field(
                PUBLISH_STATE,
                FieldRule::string()
                    .label("Publish state")
                    .required()
                    .lowercase()
                    .one_of(&PublishState::names()),
            )
            .field(VIEW_COUNT, FieldRule::int().min(0.0))
            .field(FIRST_PUBLISHED_AT, FieldRule::datetime())
    }

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Sluggable for Article {
    fn slug(&self) -> &str {
        &self.slug
    }
}

impl Publishable for Article {
    fn publish_state(&self) -> PublishState {
        self.publish_state
    }

    fn first_published_at(&self) -> Option<DateTime<Utc>> {
        self.first_published_at
    }
}

impl Categorized for Article {
    fn categories(&self) -> &[RecordId] {
        &self.categories
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Optional search dimensions for article listings.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    /// Literal substring of the title, excerpt or content.
    pub search: Option<String>,
    pub categories: Option<Vec<RecordId>>,
    pub tags: Option<Vec<String>>,
    pub author: Option<String>,
    pub publish_state: Option<PublishState>,
    /// Inclusive bounds on the first publication date.
    pub published_from: Option<DateTime<Utc>>,
    pub published_to: Option<DateTime<Utc>>,
    pub page: u64,
    pub limit: Option<u64>,
    pub sort: Option<String>,
}

impl ArticleQuery {
    fn to_filter(&self) -> VitrineResult<Filter> {
        FilterComposer::new()
            .search(self.search.as_deref(), &[TITLE, EXCERPT, CONTENT])
            .any_of(CATEGORIES, self.categories.clone())
            .any_of(TAGS, self.tags.clone())
            .eq(AUTHOR, self.author.as_deref().map(str::trim))
            .eq(PUBLISH_STATE, self.publish_state)
            .range(FIRST_PUBLISHED_AT, self.published_from, self.published_to)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleStats {
    pub total: u64,
    pub by_state: BTreeMap<PublishState, u64>,
}

/// Blog repository: filtered listings, per-author pages, related posts, view
/// counting and the publish-state machine.
#[derive(Clone)]
pub struct ArticleRepository {
    repository: Repository<Article>,
}

impl ArticleRepository {
    pub fn new(connection: Connection) -> Self {
        ArticleRepository {
            repository: Repository::new(connection),
        }
    }

    pub fn repository(&self) -> &Repository<Article> {
        &self.repository
    }

    pub async fn create(&self, mut article: Article) -> VitrineResult<Article> {
        if article.publish_state == PublishState::Published && article.first_published_at.is_none() {
            article.first_published_at = Some(now());
        }
        article.view_count = 0;
        self.repository.create(article).await
    }

    pub async fn update<I: Into<IdRef>>(&self, id: I, update: Update) -> VitrineResult<Option<Article>> {
        self.repository.update_publishable(id, update).await
    }

    pub async fn find_by_id<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Article>> {
        self.repository.find_by_id(id).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> VitrineResult<Option<Article>> {
        self.repository.find_by_slug(slug).await
    }

    pub async fn slug_exists<I: Into<IdRef>>(&self, slug: &str, exclude: I) -> VitrineResult<bool> {
        self.repository.slug_exists(slug, exclude).await
    }

    pub async fn find_with_filters(&self, query: &ArticleQuery) -> VitrineResult<Paginated<Article>> {
        self.repository
            .find_paginated(query.to_filter()?, query.page, query.limit, query.sort.as_deref())
            .await
    }

    pub async fn find_published(&self, query: &ArticleQuery) -> VitrineResult<Paginated<Article>> {
        self.repository
            .find_published(query.to_filter()?, query.page, query.limit, query.sort.as_deref())
            .await
    }

    /// Published articles of one author, newest first.
    pub async fn by_author(&self, author: &str, page: u64, limit: Option<u64>) -> VitrineResult<Paginated<Article>> {
        self.repository
            .find_published(field(AUTHOR).eq(author.trim()), page, limit, None)
            .await
    }

    pub async fn related<I: Into<IdRef>>(&self, id: I, limit: Option<u64>) -> VitrineResult<Vec<Article>> {
        self.repository.related(id, limit).await
    }

    pub async fn by_category<I: Into<IdRef>>(
        &self,
        category: I,
        page: u64,
        limit: Option<u64>,
    ) -> VitrineResult<Paginated<Article>> {
        self.repository.by_category(category, page, limit, None).await
    }

    pub async fn by_tag(&self, tag: &str, page: u64, limit: Option<u64>) -> VitrineResult<Paginated<Article>> {
        self.repository.by_tag(tag, page, limit, None).await
    }

    pub async fn set_publish_state<I: Into<IdRef>>(
        &self,
        id: I,
        state: PublishState,
    ) -> VitrineResult<Option<Article>> {
        self.repository.set_publish_state(id, state).await
    }

    /// Atomically adds one view. Concurrent calls never lose an increment.
    pub async fn increment_views<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Article>> {
        self.repository
            .update_by_id(id, Update::new().inc(VIEW_COUNT, 1), UpdateOptions::default())
            .await
    }

    pub async fn delete<I: Into<IdRef>>(&self, id: I) -> VitrineResult<Option<Article>> {
        self.repository.delete_by_id(id).await
    }

    pub async fn stats(&self) -> VitrineResult<ArticleStats> {
        let states = self.repository.count_by(Filter::All, PUBLISH_STATE).await?;
        let by_state = tally(states, PublishState::ALL);
        Ok(ArticleStats {
            total: by_state.values().sum(),
            by_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn repository() -> ArticleRepository {
        ArticleRepository::new(Connection::in_memory())
    }

    #[tokio::test]
    async fn concurrent_views_are_not_lost() {
        let articles = repository();
        let article = articles
            .create(Article::new("Hello", "hello", "ana"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let articles = articles.clone();
            let id = article.id.unwrap();
            handles.push(tokio::spawn(async move { articles.increment_views(id).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = articles.find_by_id(&article).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 10);
    }

    #[tokio::test]
    async fn patching_an_article_keeps_the_publication_stamp_consistent() {
        let articles = repository();
        let article = articles
            .create(Article::new("Hello", "hello", "ana"))
            .await
            .unwrap();

        let err = articles
            .update(&article, Update::new().set(FIRST_PUBLISHED_AT, now()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &crate::errors::ErrorKind::ValidationError);
        let stored = articles.find_by_id(&article).await.unwrap().unwrap();
        assert!(stored.first_published_at.is_none());

        let published = articles
            .update(&article, Update::new().set(PUBLISH_STATE, PublishState::Published))
            .await
            .unwrap()
            .unwrap();
        assert!(published.first_published_at.is_some());

        let public = articles.find_published(&ArticleQuery::default()).await.unwrap();
        assert_eq!(public.total, 1);
    }

    #[tokio::test]
    async fn by_author_lists_published_posts() {
        let articles = repository();
        articles
            .create(Article::new("One", "one", "ana").with_state(PublishState::Published))
            .await
            .unwrap();
        articles
            .create(Article::new("Two", "two", "ana"))
            .await
            .unwrap();
        articles
            .create(Article::new("Three", "three", "bo").with_state(PublishState::Published))
            .await
            .unwrap();

        let page = articles.by_author("ana", 1, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].slug, "one");
    }

    #[tokio::test]
    async fn publication_date_range_filters() {
        let articles = repository();
        let article = articles
            .create(Article::new("One", "one", "ana").with_state(PublishState::Published))
            .await
            .unwrap();
        articles.create(Article::new("Two", "two", "ana")).await.unwrap();
        let published = article.first_published_at.unwrap();

        let query = ArticleQuery {
            published_from: Some(published - Duration::minutes(1)),
            published_to: Some(published + Duration::minutes(1)),
            ..Default::default()
        };
        let page = articles.find_with_filters(&query).await.unwrap();
        assert_eq!(page.total, 1);

        let query = ArticleQuery {
            published_from: Some(published + Duration::minutes(1)),
            ..Default::default()
        };
        assert_eq!(articles.find_with_filters(&query).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn search_covers_content() {
        let articles = repository();
        articles
            .create(Article::new("Care", "care", "ana").with_content("After an IPL session (day 1)"))
            .await
            .unwrap();
        let query = ArticleQuery {
            search: Some("session (day".to_string()),
            ..Default::default()
        };
        assert_eq!(articles.find_with_filters(&query).await.unwrap().total, 1);
    }
}
