use txn_harness::{run_test, LifecycleEvent, ScopeTree, TestFailure};

use crate::support::fake_client::{FakeDb, FakeFactory};
use crate::support::{fake_delegate, fast_options};

#[tokio::test]
async fn test_grouped_suite_shares_one_session() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let group = tree.group(tree.root(), "checkout flow");
    let add = tree.test(group, "adds to cart");
    let pay = tree.test(group, "pays");

    delegate
        .handle_event(&tree, LifecycleEvent::SuiteStart(group))
        .await
        .unwrap();
    assert!(delegate.has_session());

    run_test(&mut delegate, &tree, add, |ctx| async move {
        ctx.client.get().expect("session open").insert("cart:1", "book");
        Ok::<(), String>(())
    })
    .await
    .unwrap();
    assert!(delegate.has_session(), "group session outlives its tests");

    run_test(&mut delegate, &tree, pay, |ctx| async move {
        let client = ctx.client.get().expect("session open");
        assert_eq!(client.get("cart:1").as_deref(), Some("book"));
        Ok::<(), String>(())
    })
    .await
    .unwrap();

    delegate
        .handle_event(&tree, LifecycleEvent::SuiteEnd(group))
        .await
        .unwrap();
    assert!(!delegate.has_session());
    delegate.teardown().await.unwrap();

    let stats = db.stats();
    assert_eq!(stats.begins, 1);
    assert_eq!(stats.rollbacks, 1);
    assert!(db.committed().is_empty());
}

#[tokio::test]
async fn test_nested_suites_inside_group_reuse_its_session() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let outer = tree.group(tree.root(), "outer");
    let inner_group = tree.group(outer, "inner group");
    let inner_plain = tree.describe(outer, "inner plain");
    let first = tree.test(inner_group, "first");
    let second = tree.test(inner_plain, "second");

    delegate
        .handle_event(&tree, LifecycleEvent::SuiteStart(outer))
        .await
        .unwrap();

    for (suite, test) in [(inner_group, first), (inner_plain, second)] {
        delegate
            .handle_event(&tree, LifecycleEvent::SuiteStart(suite))
            .await
            .unwrap();
        run_test(&mut delegate, &tree, test, |ctx| async move {
            let client = ctx.client.get().expect("session open");
            let seen = client.get("counter").unwrap_or_default();
            client.insert("counter", &format!("{seen}+"));
            Ok::<(), String>(())
        })
        .await
        .unwrap();
        delegate
            .handle_event(&tree, LifecycleEvent::SuiteEnd(suite))
            .await
            .unwrap();
        assert!(delegate.has_session());
    }

    let ctx = delegate.prepare_test_context();
    let client = ctx.client.get().expect("session open");
    assert_eq!(client.get("counter").as_deref(), Some("++"));
    drop(client);

    delegate
        .handle_event(&tree, LifecycleEvent::SuiteEnd(outer))
        .await
        .unwrap();
    delegate.teardown().await.unwrap();

    let stats = db.stats();
    assert_eq!(stats.begins, 1);
    assert_eq!(stats.max_open, 1);
}

#[tokio::test]
async fn test_failure_inside_group_keeps_session_open() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let group = tree.group(tree.root(), "group");
    let failing = tree.test(group, "fails");
    let after = tree.test(group, "after");

    delegate
        .handle_event(&tree, LifecycleEvent::SuiteStart(group))
        .await
        .unwrap();

    let result = run_test(&mut delegate, &tree, failing, |ctx| async move {
        ctx.client.get().expect("session open").insert("k", "v");
        Err::<(), _>("failed".to_string())
    })
    .await;
    assert!(matches!(result, Err(TestFailure::Body(_))));
    assert!(delegate.has_session());

    run_test(&mut delegate, &tree, after, |ctx| async move {
        let client = ctx.client.get().expect("session open");
        assert_eq!(client.get("k").as_deref(), Some("v"));
        Ok::<(), String>(())
    })
    .await
    .unwrap();

    delegate
        .handle_event(&tree, LifecycleEvent::SuiteEnd(group))
        .await
        .unwrap();
    delegate.teardown().await.unwrap();
    assert_eq!(db.stats().rollbacks, 1);
}

#[tokio::test]
async fn test_tests_after_group_get_their_own_sessions() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let group = tree.group(tree.root(), "group");
    let grouped = tree.test(group, "grouped");
    let loose = tree.test(tree.root(), "loose");

    delegate
        .handle_event(&tree, LifecycleEvent::SuiteStart(group))
        .await
        .unwrap();
    run_test(&mut delegate, &tree, grouped, |ctx| async move {
        ctx.client.get().expect("session open").insert("k", "v");
        Ok::<(), String>(())
    })
    .await
    .unwrap();
    delegate
        .handle_event(&tree, LifecycleEvent::SuiteEnd(group))
        .await
        .unwrap();

    run_test(&mut delegate, &tree, loose, |ctx| async move {
        assert_eq!(ctx.client.get().expect("session open").get("k"), None);
        Ok::<(), String>(())
    })
    .await
    .unwrap();
    delegate.teardown().await.unwrap();

    let stats = db.stats();
    assert_eq!(stats.begins, 2);
    assert_eq!(stats.rollbacks, 2);
}
