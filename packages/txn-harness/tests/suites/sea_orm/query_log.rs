use std::sync::Arc;

use txn_harness::{run_test, MemoryQueryLog, ScopeTree};

use super::{sea_delegate, sqlite_options, SEA_TEST_PATH};
use crate::support::sqlite::{count_widgets, insert_widget, temp_sqlite};

#[tokio::test]
async fn test_verbose_query_reports_statements_run_in_a_test() {
    let db = temp_sqlite();
    let mut options = sqlite_options(&db);
    options.verbose_query = true;
    let (delegate, table) = sea_delegate(options).await;
    let log = Arc::new(MemoryQueryLog::new());
    let mut delegate = delegate.with_query_log_sink(log.clone());
    let table = &table;

    let mut tree = ScopeTree::new();
    let suite = tree.describe(tree.root(), "widgets");
    let test = tree.test(suite, "logs queries");

    run_test(&mut delegate, &tree, test, |ctx| async move {
        let client = ctx.client.get().expect("session open");
        insert_widget(&client, table, "a").await.map_err(|e| e.to_string())?;
        insert_widget(&client, table, "b").await.map_err(|e| e.to_string())?;
        count_widgets(&client, table).await.map_err(|e| e.to_string())?;
        Ok::<(), String>(())
    })
    .await
    .unwrap();

    let lines = log.lines();
    assert_eq!(lines.len(), 3, "got: {lines:?}");
    let breadcrumb = format!("{SEA_TEST_PATH} > widgets > logs queries");
    assert!(lines.iter().all(|(crumb, _)| *crumb == breadcrumb));
    assert!(lines[0].1.starts_with("INSERT INTO"));
    assert!(lines[1].1.starts_with("INSERT INTO"));
    assert!(lines[2].1.starts_with("SELECT COUNT(*)"));

    delegate.teardown().await.unwrap();
}
