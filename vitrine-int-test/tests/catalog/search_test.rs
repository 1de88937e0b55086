use vitrine::entities::{Product, ProductQuery, PublishState, Visibility};
use vitrine::repository::IdRef;
use vitrine_int_test::test_util::{create_test_context, fake_product, filler, unique_slug};

#[tokio::test]
async fn search_returns_the_matching_published_subset_newest_first() {
    let ctx = create_test_context().unwrap();
    let seeds = vec![
        Product::new("Quasarlux 808 diode", &unique_slug("p"))
            .with_description(&filler())
            .with_state(PublishState::Published),
        fake_product(PublishState::Published),
        Product::new("Cooling tip", &unique_slug("p"))
            .with_description("Pairs with every QUASARLUX handpiece")
            .with_state(PublishState::Published),
        Product::new("Quasarlux prototype", &unique_slug("p"))
            .with_description(&filler())
            .with_state(PublishState::Draft),
        fake_product(PublishState::Draft),
    ];
    let mut created = Vec::new();
    for product in seeds {
        created.push(ctx.products.create(product).await.unwrap());
    }

    let query = ProductQuery {
        search: Some("quasarLux".to_string()),
        publish_state: Some(PublishState::Published),
        ..Default::default()
    };
    let page = ctx.products.find_with_filters(&query).await.unwrap();

    assert_eq!(page.total, 2);
    let ids: Vec<_> = page.data.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![created[2].id, created[0].id]);
}

#[tokio::test]
async fn metacharacters_are_matched_literally() {
    let ctx = create_test_context().unwrap();
    let literal = ctx
        .products
        .create(Product::new("Filter a.b*c (rev 2)", &unique_slug("p")))
        .await
        .unwrap();
    ctx.products
        .create(Product::new("Filter aXbbbc", &unique_slug("p")))
        .await
        .unwrap();

    for term in ["a.b*c", "(rev 2)", "a.b*c (rev"] {
        let query = ProductQuery {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let page = ctx.products.find_with_filters(&query).await.unwrap();
        assert_eq!(page.total, 1, "term {:?}", term);
        assert_eq!(page.data[0].id, literal.id);
    }

    for term in ["[", "(", "\\", "*+?{2,}", "$^|"] {
        let query = ProductQuery {
            search: Some(term.to_string()),
            ..Default::default()
        };
        assert!(ctx.products.find_with_filters(&query).await.is_ok());
    }
}

#[tokio::test]
async fn public_listing_hides_restricted_products() {
    let ctx = create_test_context().unwrap();
    ctx.products
        .create(fake_product(PublishState::Published))
        .await
        .unwrap();
    ctx.products
        .create(fake_product(PublishState::Published).with_visibility(Visibility::Restricted))
        .await
        .unwrap();
    ctx.products
        .create(fake_product(PublishState::Private))
        .await
        .unwrap();

    let page = ctx
        .products
        .find_published(&ProductQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].visibility, Visibility::Public);
}

#[tokio::test]
async fn slug_exists_ignores_the_excluded_record() {
    let ctx = create_test_context().unwrap();
    let product = ctx
        .products
        .create(Product::new("Diode", "diode-808"))
        .await
        .unwrap();

    assert!(ctx.products.slug_exists("diode-808", IdRef::Missing).await.unwrap());
    assert!(ctx.products.slug_exists(" Diode-808 ", IdRef::Missing).await.unwrap());
    assert!(!ctx.products.slug_exists("diode-808", &product).await.unwrap());
    assert!(!ctx.products.slug_exists("diode-810", IdRef::Missing).await.unwrap());

    let other = ctx
        .products
        .create(Product::new("Other", "other"))
        .await
        .unwrap();
    assert!(ctx.products.slug_exists("diode-808", &other).await.unwrap());
}

#[tokio::test]
async fn related_products_share_a_category_or_tag() {
    use vitrine::entities::Category;

    let ctx = create_test_context().unwrap();
    let lasers = ctx
        .categories
        .create(Category::new("Lasers", "lasers"))
        .await
        .unwrap();
    let base = ctx
        .products
        .create(
            fake_product(PublishState::Published)
                .with_categories(vec![lasers.id.unwrap()])
                .with_tags(&["hair"]),
        )
        .await
        .unwrap();
    let by_category = ctx
        .products
        .create(fake_product(PublishState::Published).with_categories(vec![lasers.id.unwrap()]))
        .await
        .unwrap();
    let by_tag = ctx
        .products
        .create(fake_product(PublishState::Published).with_tags(&["hair"]))
        .await
        .unwrap();
    ctx.products
        .create(fake_product(PublishState::Draft).with_tags(&["hair"]))
        .await
        .unwrap();
    ctx.products
        .create(fake_product(PublishState::Published).with_tags(&["skin"]))
        .await
        .unwrap();

    let related = ctx.products.related(&base, None).await.unwrap();
    let ids: Vec<_> = related.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![by_tag.id, by_category.id]);

    let limited = ctx.products.related(&base, Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
}
