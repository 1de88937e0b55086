use std::collections::HashSet;
use vitrine::entities::{ProductQuery, PublishState};
use vitrine::errors::ErrorKind;
use vitrine_int_test::test_util::{create_test_context, create_test_context_with, fake_product};

async fn seed(ctx: &vitrine_int_test::test_util::TestContext, count: usize) {
    for _ in 0..count {
        ctx.products
            .create(fake_product(PublishState::Published))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn page_shape_holds_for_every_limit() {
    let ctx = create_test_context_with(|builder| builder.max_page_limit(10)).unwrap();
    seed(&ctx, 23).await;

    for limit in [None, Some(0), Some(1), Some(4), Some(7), Some(10), Some(500)] {
        for page in 0..5u64 {
            let query = ProductQuery {
                page,
                limit,
                ..Default::default()
            };
            let result = ctx.products.find_with_filters(&query).await.unwrap();
            let clamped = result.limit;

            assert!(clamped >= 1 && clamped <= 10, "limit {:?} became {}", limit, clamped);
            if let Some(requested) = limit.filter(|l| *l >= 1) {
                assert_eq!(clamped, requested.min(10));
            }
            assert_eq!(result.total, 23);
            assert_eq!(result.total_pages, (23 + clamped - 1) / clamped);
            assert!(result.data.len() as u64 <= clamped);
        }
    }
}

#[tokio::test]
async fn walking_pages_visits_every_record_once() {
    let ctx = create_test_context().unwrap();
    seed(&ctx, 17).await;

    let mut seen = HashSet::new();
    let mut page = 1;
    loop {
        let query = ProductQuery {
            page,
            limit: Some(5),
            sort: Some("title".to_string()),
            ..Default::default()
        };
        let result = ctx.products.find_with_filters(&query).await.unwrap();
        for product in &result.data {
            assert!(seen.insert(product.id.unwrap()), "{} listed twice", product.title);
        }
        if !result.has_next() {
            break;
        }
        page += 1;
    }
    assert_eq!(seen.len(), 17);
    assert_eq!(page, 4);
}

#[tokio::test]
async fn a_page_past_the_end_is_empty() {
    let ctx = create_test_context().unwrap();
    seed(&ctx, 3).await;

    let query = ProductQuery {
        page: 9,
        limit: Some(2),
        ..Default::default()
    };
    let result = ctx.products.find_with_filters(&query).await.unwrap();
    assert!(result.data.is_empty());
    assert_eq!(result.total, 3);
    assert_eq!(result.total_pages, 2);
}

#[tokio::test]
async fn unknown_sort_syntax_is_rejected() {
    let ctx = create_test_context().unwrap();
    let query = ProductQuery {
        sort: Some("title,,-".to_string()),
        ..Default::default()
    };
    let err = ctx.products.find_with_filters(&query).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
}
