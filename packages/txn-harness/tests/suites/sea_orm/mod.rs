mod query_log;

use std::sync::Arc;

use txn_harness::sea::{SeaOrmClient, SeaOrmFactory, SEA_ORM_CLIENT};
use txn_harness::{HarnessOptions, SharedClients, TransactionDelegate};

use crate::support::fast_options;
use crate::support::sqlite::{create_widgets, SqliteDb};

pub const SEA_TEST_PATH: &str = "tests/sea_orm_tests.rs";

pub fn sqlite_options(db: &SqliteDb) -> HarnessOptions {
    HarnessOptions {
        client_module_path: Some(SEA_ORM_CLIENT.to_string()),
        connection_url: Some(db.url.clone()),
        ..fast_options()
    }
}

/// Delegate over `options` plus a freshly created widgets table.
pub async fn sea_delegate(options: HarnessOptions) -> (TransactionDelegate<SeaOrmClient>, String) {
    let delegate = TransactionDelegate::initialize(
        options,
        Arc::new(SharedClients::new()),
        &SeaOrmFactory,
        SEA_TEST_PATH,
    )
    .await
    .expect("sea-orm delegate should initialize");
    let table = create_widgets(delegate.prepare_test_context().original_client.as_ref())
        .await
        .expect("create widgets table");
    (delegate, table)
}
