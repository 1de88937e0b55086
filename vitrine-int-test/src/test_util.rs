use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Words};
use fake::faker::name::en::Name;
use fake::Fake;
use std::sync::Arc;
use vitrine::collection::RecordId;
use vitrine::connection::Connection;
use vitrine::entities::{
    Article, ArticleRepository, BlogCategoryRepository, Category, CategoryRepository, Product,
    ProductRepository, PublishState, Submission, SubmissionRepository, SubmissionType,
};
use vitrine::errors::VitrineResult;
use vitrine::repository::{OperationObserver, RecordingObserver};
use vitrine::store::memory::{InMemoryModule, InMemoryStore};
use vitrine::store::{DocumentStoreProvider, MetricsSnapshot};

/// One connection over an inspectable in-memory store, with every repository
/// wired to it.
#[derive(Clone)]
pub struct TestContext {
    connection: Connection,
    store: InMemoryStore,
    observer: Arc<RecordingObserver>,
    pub categories: CategoryRepository,
    pub blog_categories: BlogCategoryRepository,
    pub products: ProductRepository,
    pub articles: ArticleRepository,
    pub submissions: SubmissionRepository,
}

impl TestContext {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn observer(&self) -> &RecordingObserver {
        &self.observer
    }

    /// Current store call counters, for diffing with [MetricsSnapshot::since].
    pub fn metrics(&self) -> MetricsSnapshot {
        self.store.metrics()
    }
}

pub fn create_test_context() -> VitrineResult<TestContext> {
    create_test_context_with(|builder| builder)
}

/// Like [create_test_context], letting the caller adjust the connection settings.
pub fn create_test_context_with<F>(configure: F) -> VitrineResult<TestContext>
where
    F: FnOnce(vitrine::connection::ConnectionBuilder) -> vitrine::connection::ConnectionBuilder,
{
    let store = InMemoryStore::new();
    let observer = Arc::new(RecordingObserver::new());
    let shared: Arc<dyn OperationObserver> = observer.clone();
    let connection = configure(
        Connection::builder()
            .store_module(InMemoryModule::with_store(store.clone()))
            .observer(shared),
    )
    .build()?;

    Ok(TestContext {
        categories: CategoryRepository::new(connection.clone()),
        blog_categories: BlogCategoryRepository::new(connection.clone()),
        products: ProductRepository::new(connection.clone()),
        articles: ArticleRepository::new(connection.clone()),
        submissions: SubmissionRepository::new(connection.clone()),
        connection,
        store,
        observer,
    })
}

/// A slug that cannot collide with anything else in the test run.
pub fn unique_slug(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Filler prose that never contains the marker words tests search for.
pub fn filler() -> String {
    Sentence(4..9).fake()
}

pub fn fake_tags(count: usize) -> Vec<String> {
    let words: Vec<String> = Words(count..count + 1).fake();
    words.into_iter().map(|w| w.to_lowercase()).collect()
}

pub fn fake_product(state: PublishState) -> Product {
    let title: String = CompanyName().fake();
    Product::new(&title, &unique_slug("product"))
        .with_description(&filler())
        .with_state(state)
}

pub fn fake_article(state: PublishState) -> Article {
    let author: String = Name().fake();
    Article::new(&filler(), &unique_slug("article"), &author)
        .with_content(&filler())
        .with_state(state)
}

pub fn fake_submission(submission_type: SubmissionType) -> Submission {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    Submission::new(submission_type, &name, &email).with_message(&filler())
}

/// Creates a chain of categories, each the child of the one before it.
pub async fn seed_category_chain(
    repository: &CategoryRepository,
    nodes: &[(&str, &str)],
) -> VitrineResult<Vec<Category>> {
    let mut created = Vec::with_capacity(nodes.len());
    let mut parent: Option<RecordId> = None;
    for (name, slug) in nodes {
        let category = repository
            .create(Category::new(name, slug).with_parent(parent))
            .await?;
        parent = category.id;
        created.push(category);
    }
    Ok(created)
}
