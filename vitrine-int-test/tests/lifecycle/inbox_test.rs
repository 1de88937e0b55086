use vitrine::entities::{SubmissionQuery, SubmissionStatus, SubmissionType};
use vitrine::store::StoreOperation;
use vitrine_int_test::test_util::{create_test_context, fake_submission};

#[tokio::test]
async fn triage_flow_keeps_counts_consistent() {
    let ctx = create_test_context().unwrap();
    let mut created = Vec::new();
    for kind in [
        SubmissionType::Contact,
        SubmissionType::Quote,
        SubmissionType::Quote,
        SubmissionType::Support,
        SubmissionType::Newsletter,
    ] {
        created.push(ctx.submissions.create(fake_submission(kind)).await.unwrap());
    }
    assert_eq!(ctx.submissions.count_unread().await.unwrap(), 5);

    let quotes: Vec<_> = created
        .iter()
        .filter(|s| s.submission_type == SubmissionType::Quote)
        .filter_map(|s| s.id)
        .collect();
    let before = ctx.metrics();
    let result = ctx.submissions.mark_many_read(&quotes).await.unwrap();
    assert_eq!(result.modified_count(), 2);
    assert_eq!(ctx.metrics().since(&before).write_calls(), 1);

    ctx.submissions.archive(&created[0]).await.unwrap();

    let stats = ctx.submissions.stats().await.unwrap();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.by_status[&SubmissionStatus::New], 2);
    assert_eq!(stats.by_status[&SubmissionStatus::Read], 2);
    assert_eq!(stats.by_status[&SubmissionStatus::Archived], 1);
    assert_eq!(stats.by_type[&SubmissionType::Quote], 2);

    let unread = ctx
        .submissions
        .find_with_filters(&SubmissionQuery {
            statuses: Some(vec![SubmissionStatus::New]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(unread.total, 2);
    assert!(unread.data.iter().all(|s| s.read_at.is_none()));
}

#[tokio::test]
async fn stats_take_two_grouped_reads() {
    let ctx = create_test_context().unwrap();
    ctx.submissions
        .create(fake_submission(SubmissionType::Contact))
        .await
        .unwrap();

    let before = ctx.metrics();
    ctx.submissions.stats().await.unwrap();
    let delta = ctx.metrics().since(&before);
    assert_eq!(delta.calls(StoreOperation::CountBy), 2);
    assert_eq!(delta.calls(StoreOperation::Find), 0);
}
