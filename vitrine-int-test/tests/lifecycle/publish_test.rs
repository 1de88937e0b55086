use std::time::Duration;
use vitrine::collection::RecordId;
use vitrine::entities::{ArticleQuery, PublishState};
use vitrine::errors::ErrorKind;
use vitrine_int_test::test_util::{create_test_context, fake_article};

#[tokio::test]
async fn first_publish_stamp_never_moves() {
    let ctx = create_test_context().unwrap();
    let draft = ctx
        .articles
        .create(fake_article(PublishState::Draft))
        .await
        .unwrap();
    assert_eq!(draft.first_published_at, None);

    let published = ctx
        .articles
        .set_publish_state(&draft, PublishState::Published)
        .await
        .unwrap()
        .unwrap();
    let stamp = published.first_published_at.expect("stamped on publish");

    tokio::time::sleep(Duration::from_millis(5)).await;
    let again = ctx
        .articles
        .set_publish_state(&draft, PublishState::Published)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.first_published_at, Some(stamp));

    ctx.articles
        .set_publish_state(&draft, PublishState::Draft)
        .await
        .unwrap();
    let republished = ctx
        .articles
        .set_publish_state(&draft, PublishState::Published)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(republished.first_published_at, Some(stamp));
    assert!(republished.updated_at > published.updated_at);
}

#[tokio::test]
async fn only_published_articles_are_public() {
    let ctx = create_test_context().unwrap();
    for state in [
        PublishState::Draft,
        PublishState::Private,
        PublishState::Published,
        PublishState::Published,
    ] {
        ctx.articles.create(fake_article(state)).await.unwrap();
    }

    let public = ctx
        .articles
        .find_published(&ArticleQuery::default())
        .await
        .unwrap();
    assert_eq!(public.total, 2);
    assert!(public
        .data
        .iter()
        .all(|a| a.publish_state == PublishState::Published && a.first_published_at.is_some()));

    let stats = ctx.articles.stats().await.unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.by_state[&PublishState::Private], 1);
}

#[tokio::test]
async fn publishing_a_missing_article_is_a_no_op() {
    let ctx = create_test_context().unwrap();
    let result = ctx
        .articles
        .set_publish_state(RecordId::new(), PublishState::Published)
        .await
        .unwrap();
    assert!(result.is_none());

    let err = ctx
        .articles
        .set_publish_state("not-a-record-id", PublishState::Published)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::CastError);
}
