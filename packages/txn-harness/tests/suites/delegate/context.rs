use std::sync::Arc;

use txn_harness::{run_test, LifecycleEvent, ScopeTree};

use crate::support::fake_client::{FakeDb, FakeFactory};
use crate::support::{fake_delegate, fast_options};

#[tokio::test]
async fn test_client_is_unavailable_outside_sessions() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let test = tree.test(tree.root(), "uses client");

    let ctx = delegate.prepare_test_context();
    assert!(ctx.client.get().is_none());
    assert_eq!(ctx.original_client.get_committed("seed"), None);

    run_test(&mut delegate, &tree, test, |ctx| async move {
        assert!(ctx.client.get().is_some());
        Ok::<(), String>(())
    })
    .await
    .unwrap();

    assert!(ctx.client.get().is_none(), "slot is cleared when the session ends");
    delegate.teardown().await.unwrap();
}

#[tokio::test]
async fn test_context_handed_out_early_sees_later_session() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let test = tree.test(tree.root(), "late binding");

    let early = delegate.prepare_test_context();
    delegate
        .handle_event(&tree, LifecycleEvent::TestStart(test))
        .await
        .unwrap();
    early.client.get().expect("session open").insert("k", "v");
    delegate
        .handle_event(&tree, LifecycleEvent::TestDone(test))
        .await
        .unwrap();
    delegate.teardown().await.unwrap();

    assert!(db.committed().is_empty());
}

#[tokio::test]
async fn test_in_transaction_runs_in_place() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let test = tree.test(tree.root(), "nested transaction");

    run_test(&mut delegate, &tree, test, |ctx| async move {
        let client = ctx.client.get().expect("session open");
        let handle = client
            .in_transaction(|tx| async move {
                tx.insert("order:1", "open");
                Ok::<_, String>(tx)
            })
            .await?;
        assert!(Arc::ptr_eq(&handle, client.handle()));
        assert_eq!(client.get("order:1").as_deref(), Some("open"));

        let err = client
            .in_transaction(|_tx| async move { Err::<(), _>("inner failure".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "inner failure");
        assert_eq!(
            client.get("order:1").as_deref(),
            Some("open"),
            "inner failure does not undo the session"
        );
        Ok::<(), String>(())
    })
    .await
    .unwrap();
    delegate.teardown().await.unwrap();

    let stats = db.stats();
    assert_eq!(stats.begins, 1, "no extra transaction was opened");
    assert!(db.committed().is_empty());
}

#[tokio::test]
async fn test_batch_runs_in_order_against_session() {
    let db = FakeDb::new();
    let factory = FakeFactory::new(db.clone());
    let mut delegate = fake_delegate(fast_options(), &factory).await;

    let mut tree = ScopeTree::new();
    let test = tree.test(tree.root(), "batch");

    run_test(&mut delegate, &tree, test, |ctx| async move {
        let client = ctx.client.get().expect("session open");
        let tx = client.handle().clone();
        let results = client
            .batch(vec![
                Box::pin({
                    let tx = tx.clone();
                    async move {
                        tx.insert("a", "1");
                        Ok::<_, String>(tx.get("a"))
                    }
                }) as futures::future::BoxFuture<'static, Result<Option<String>, String>>,
                Box::pin({
                    let tx = tx.clone();
                    async move {
                        tx.insert("b", "2");
                        Ok(tx.get("a"))
                    }
                }),
            ])
            .await?;
        assert_eq!(results, vec![Some("1".to_string()), Some("1".to_string())]);
        assert_eq!(client.get("b").as_deref(), Some("2"));
        Ok::<(), String>(())
    })
    .await
    .unwrap();
    delegate.teardown().await.unwrap();

    assert!(db.committed().is_empty());
}
