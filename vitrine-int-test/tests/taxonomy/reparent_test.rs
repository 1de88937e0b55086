use vitrine::entities::{Category, ProductTaxonomy, PublishState, TaxonomyKind};
use vitrine::store::StoreOperation;
use vitrine_int_test::test_util::{create_test_context, fake_product, seed_category_chain};

#[tokio::test]
async fn deleting_a_parent_moves_children_up_in_one_write() {
    let ctx = create_test_context().unwrap();
    let chain = seed_category_chain(&ctx.categories, &[("Grand", "grand"), ("Parent", "parent")])
        .await
        .unwrap();
    let (grand, parent) = (&chain[0], &chain[1]);
    let c1 = ctx
        .categories
        .create(Category::new("C1", "c1").with_parent(parent.id))
        .await
        .unwrap();
    let c2 = ctx
        .categories
        .create(Category::new("C2", "c2").with_parent(parent.id))
        .await
        .unwrap();

    let before = ctx.metrics();
    let deleted = ctx.categories.delete(parent).await.unwrap();
    let delta = ctx.metrics().since(&before);
    assert_eq!(deleted.unwrap().slug, "parent");

    // one reparent write plus one cleanup write per referencing field
    let cleanup_writes = ProductTaxonomy::references().len() as u64;
    assert_eq!(delta.calls(StoreOperation::UpdateMany), 1 + cleanup_writes);
    assert_eq!(delta.calls(StoreOperation::FindOneAndDelete), 1);
    assert_eq!(delta.calls(StoreOperation::FindOneAndUpdate), 0);

    for child in [&c1, &c2] {
        let moved = ctx.categories.find_by_id(child).await.unwrap().unwrap();
        assert_eq!(moved.parent, grand.id);
    }
    assert!(ctx.categories.find_by_id(parent).await.unwrap().is_none());

    let breadcrumb = ctx.categories.breadcrumb(&c1).await.unwrap();
    assert_eq!(breadcrumb.path, "grand/c1");
}

#[tokio::test]
async fn deleting_a_category_detaches_it_from_every_product() {
    let ctx = create_test_context().unwrap();
    let a = ctx
        .categories
        .create(Category::new("Lasers", "lasers"))
        .await
        .unwrap();
    let b = ctx
        .categories
        .create(Category::new("Skin", "skin"))
        .await
        .unwrap();

    let first = ctx
        .products
        .create(
            fake_product(PublishState::Published)
                .with_categories(vec![a.id.unwrap(), b.id.unwrap()]),
        )
        .await
        .unwrap();
    let second = ctx
        .products
        .create(fake_product(PublishState::Draft).with_categories(vec![a.id.unwrap()]))
        .await
        .unwrap();
    let untouched = ctx
        .products
        .create(fake_product(PublishState::Draft).with_categories(vec![b.id.unwrap()]))
        .await
        .unwrap();

    ctx.categories.delete(&a).await.unwrap();

    let first_after = ctx.products.find_by_id(&first).await.unwrap().unwrap();
    assert_eq!(first_after.categories, vec![b.id.unwrap()]);
    assert_eq!(first_after.primary_category, None);
    assert_eq!(first_after.title, first.title);
    assert_eq!(first_after.updated_at, first.updated_at);

    let second_after = ctx.products.find_by_id(&second).await.unwrap().unwrap();
    assert!(second_after.categories.is_empty());
    assert_eq!(second_after.primary_category, None);
    assert_eq!(second_after.slug, second.slug);

    let untouched_after = ctx.products.find_by_id(&untouched).await.unwrap().unwrap();
    assert_eq!(untouched_after, untouched);
}

#[tokio::test]
async fn failed_cleanup_is_reported_and_can_be_rerun() {
    use vitrine::cascade::ReferenceCleanup;
    use vitrine::errors::ErrorKind;

    let ctx = create_test_context().unwrap();
    let category = ctx
        .categories
        .create(Category::new("Lasers", "lasers"))
        .await
        .unwrap();
    let product = ctx
        .products
        .create(fake_product(PublishState::Draft).with_categories(vec![category.id.unwrap()]))
        .await
        .unwrap();

    ctx.store()
        .fail_next(StoreOperation::UpdateMany, ErrorKind::Timeout);
    let err = ctx.categories.delete(&category).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::PartialWrite);
    assert!(ctx.categories.find_by_id(&category).await.unwrap().is_none());

    let cleanup = ReferenceCleanup::new(ctx.connection().clone(), ProductTaxonomy::references());
    let report = cleanup.run(category.id.unwrap()).await.unwrap();
    assert!(report.total_modified() >= 1);

    let after = ctx.products.find_by_id(&product).await.unwrap().unwrap();
    assert!(after.categories.is_empty());
    assert_eq!(after.primary_category, None);
}
