use fake::faker::lorem::en::Word;
use fake::Fake;
use vitrine::collection::{RecordId, Update};
use vitrine::entities::Category;
use vitrine::errors::ErrorKind;
use vitrine::store::StoreOperation;
use vitrine::tree::{flatten, TreeNode};
use vitrine_int_test::test_util::{create_test_context, seed_category_chain, unique_slug};

#[tokio::test]
async fn lasers_ipl_tree_and_breadcrumb() {
    let ctx = create_test_context().unwrap();
    let lasers = ctx
        .categories
        .create(Category::new("Lasers", "lasers"))
        .await
        .unwrap();
    let ipl = ctx
        .categories
        .create(Category::new("IPL", "ipl").with_parent(lasers.id))
        .await
        .unwrap();

    let tree = ctx.categories.get_tree(false).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].record.slug, "lasers");
    assert_eq!(tree[0].depth, 0);
    assert_eq!(tree[0].children.len(), 1);
    assert_eq!(tree[0].children[0].depth, 1);
    assert_eq!(tree[0].children[0].path, "lasers/ipl");

    let breadcrumb = ctx.categories.breadcrumb(&ipl).await.unwrap();
    assert_eq!(breadcrumb.path, "lasers/ipl");
    assert_eq!(breadcrumb.trail.len(), 2);
}

#[tokio::test]
async fn inactive_branches_are_hidden_from_the_active_tree() {
    let ctx = create_test_context().unwrap();
    let root = ctx
        .categories
        .create(Category::new("Lasers", "lasers"))
        .await
        .unwrap();
    ctx.categories
        .create(Category::new("Retired", "retired").with_parent(root.id).inactive())
        .await
        .unwrap();

    let active = ctx.categories.get_tree(true).await.unwrap();
    assert_eq!(active[0].size(), 1);
    let all = ctx.categories.get_tree(false).await.unwrap();
    assert_eq!(all[0].size(), 2);
}

#[tokio::test]
async fn random_forest_builds_a_consistent_tree() {
    let ctx = create_test_context().unwrap();
    let mut ids: Vec<RecordId> = Vec::new();
    for i in 0..30usize {
        let parent = if i == 0 || (0..4).fake::<u8>() == 0 {
            None
        } else {
            Some(ids[(0..i).fake::<usize>()])
        };
        let name: String = Word().fake();
        let created = ctx
            .categories
            .create(
                Category::new(&name, &unique_slug("node"))
                    .with_parent(parent)
                    .with_order((0..3).fake::<i64>()),
            )
            .await
            .unwrap();
        ids.push(created.id.unwrap());
    }

    let tree = ctx.categories.get_tree(false).await.unwrap();
    let nodes = flatten(&tree);
    assert_eq!(nodes.len(), 30);

    for node in &nodes {
        let ancestors = ctx.categories.ancestors(&node.record).await.unwrap();
        assert_eq!(node.depth, ancestors.len());
    }
    assert_siblings_sorted(&tree);
}

fn assert_siblings_sorted(siblings: &[TreeNode<Category>]) {
    for pair in siblings.windows(2) {
        let a = (pair[0].record.order, pair[0].record.name.clone());
        let b = (pair[1].record.order, pair[1].record.name.clone());
        assert!(a <= b, "{:?} sorted after {:?}", a, b);
    }
    for node in siblings {
        assert_siblings_sorted(&node.children);
    }
}

#[tokio::test]
async fn moving_under_a_descendant_changes_nothing() {
    let ctx = create_test_context().unwrap();
    let chain = seed_category_chain(&ctx.categories, &[("A", "a"), ("B", "b"), ("C", "c")])
        .await
        .unwrap();
    let (a, c) = (&chain[0], &chain[2]);

    let before = ctx.metrics();
    let err = ctx.categories.move_node(a, c.id).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::CycleDetected);

    let err = ctx
        .categories
        .update(a, Update::new().set("parent", c.id.unwrap()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::CycleDetected);

    let err = ctx.categories.move_node(a, a.id).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::CycleDetected);

    assert_eq!(ctx.metrics().since(&before).write_calls(), 0);
    let unchanged = ctx.categories.find_by_id(a).await.unwrap().unwrap();
    assert_eq!(unchanged.parent, None);
    assert_eq!(unchanged.updated_at, a.updated_at);
}

#[tokio::test]
async fn sibling_reorder_is_a_single_batch() {
    let ctx = create_test_context().unwrap();
    let mut siblings = Vec::new();
    for (i, slug) in ["x", "y", "z", "w"].iter().enumerate() {
        siblings.push(
            ctx.categories
                .create(Category::new(slug, slug).with_order(i as i64))
                .await
                .unwrap(),
        );
    }

    let positions: Vec<(RecordId, i64)> = siblings
        .iter()
        .rev()
        .enumerate()
        .map(|(i, c)| (c.id.unwrap(), i as i64))
        .collect();
    let before = ctx.metrics();
    let result = ctx.categories.reorder(&positions).await.unwrap();
    let delta = ctx.metrics().since(&before);

    assert!(result.is_complete());
    assert_eq!(delta.calls(StoreOperation::BulkWrite), 1);
    assert_eq!(delta.write_calls(), 1);

    let roots: Vec<String> = ctx
        .categories
        .roots()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.slug)
        .collect();
    assert_eq!(roots, vec!["w", "z", "y", "x"]);
}
