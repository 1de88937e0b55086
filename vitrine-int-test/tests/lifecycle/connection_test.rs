use vitrine::entities::{BlogCategory, Category, PublishState};
use vitrine::errors::ErrorKind;
use vitrine::repository::OperationOutcome;
use vitrine::store::StoreOperation;
use vitrine_int_test::test_util::{create_test_context, fake_article, fake_product};

#[tokio::test]
async fn repositories_share_one_lazily_opened_store() {
    let ctx = create_test_context().unwrap();
    assert!(!ctx.connection().is_initialized());

    let (category, product, blog_category) = tokio::try_join!(
        ctx.categories.create(Category::new("Lasers", "lasers")),
        ctx.products.create(fake_product(PublishState::Draft)),
        ctx.blog_categories.create(BlogCategory::new("News", "news"))
    )
    .unwrap();
    assert!(ctx.connection().is_initialized());

    let mut names = ctx.store().collection_names();
    names.sort();
    assert_eq!(names, vec!["blog_categories", "categories", "products"]);

    // same slug, different taxonomies
    assert!(ctx.categories.find_by_slug("lasers").await.unwrap().is_some());
    assert!(ctx.blog_categories.find_by_slug("lasers").await.unwrap().is_none());
    assert_eq!(category.slug, "lasers");
    assert_eq!(blog_category.slug, "news");
    assert!(product.id.is_some());
}

#[tokio::test]
async fn closed_connection_refuses_work() {
    let ctx = create_test_context().unwrap();
    ctx.articles
        .create(fake_article(PublishState::Draft))
        .await
        .unwrap();

    ctx.connection().close().await.unwrap();
    assert!(ctx.connection().is_closed());

    let err = ctx
        .articles
        .create(fake_article(PublishState::Draft))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ConnectionError);
}

#[tokio::test]
async fn store_failures_are_wrapped_and_reported() {
    let ctx = create_test_context().unwrap();
    ctx.products
        .create(fake_product(PublishState::Published))
        .await
        .unwrap();
    ctx.observer().clear();

    ctx.store().fail_next(StoreOperation::Find, ErrorKind::Timeout);
    let err = ctx.products.find_by_slug("anything").await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Timeout);
    assert_eq!(err.message(), "Failed to find_one Product");
    assert_eq!(err.cause().map(|c| c.kind()), Some(&ErrorKind::Timeout));

    let events = ctx.observer().events_of("find_one");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, OperationOutcome::Failure(ErrorKind::Timeout));

    // the next call is unaffected
    assert!(ctx.products.find_by_slug("anything").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_slugs_surface_as_client_errors() {
    let ctx = create_test_context().unwrap();
    ctx.categories
        .create(Category::new("Lasers", "lasers"))
        .await
        .unwrap();
    ctx.observer().clear();

    let err = ctx
        .categories
        .create(Category::new("Lasers again", "LASERS"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
    assert!(err.cause().is_none());

    let events = ctx.observer().events_of("create");
    assert_eq!(
        events[0].outcome,
        OperationOutcome::ClientError(ErrorKind::DuplicateKey)
    );
}
