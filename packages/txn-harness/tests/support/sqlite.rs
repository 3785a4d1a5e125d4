//! File-backed SQLite databases for sea-orm tests.

use harness_test_support::unique_helpers::{unique_str, unique_table};
use sea_orm::{ConnectionTrait, DbErr, Statement};
use tempfile::TempDir;

pub struct SqliteDb {
    pub url: String,
    // Removing the directory deletes the database.
    _dir: TempDir,
}

pub fn temp_sqlite() -> SqliteDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(format!("{}.db", unique_str("harness")));
    SqliteDb {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        _dir: dir,
    }
}

/// Create a fresh `widgets` table and return its name.
pub async fn create_widgets<C: ConnectionTrait>(conn: &C) -> Result<String, DbErr> {
    let table = unique_table("widgets");
    conn.execute_unprepared(&format!(
        "CREATE TABLE {table} (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)"
    ))
    .await?;
    Ok(table)
}

pub async fn insert_widget<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    name: &str,
) -> Result<(), DbErr> {
    conn.execute(Statement::from_string(
        conn.get_database_backend(),
        format!("INSERT INTO {table} (name) VALUES ('{name}')"),
    ))
    .await?;
    Ok(())
}

pub async fn count_widgets<C: ConnectionTrait>(conn: &C, table: &str) -> Result<i64, DbErr> {
    let row = conn
        .query_one(Statement::from_string(
            conn.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await?
        .ok_or_else(|| DbErr::Custom("count returned no row".to_string()))?;
    row.try_get::<i64>("", "n")
}
