use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::AppError;

const MIGRATION_0001: (&str, &str) = (
    "0001_init.sql",
    include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../migrations/0001_init.sql"
    )),
);

fn migrations() -> Vec<(&'static str, &'static str)> {
    vec![MIGRATION_0001]
}

pub fn open(path: &Path) -> Result<Connection, AppError> {
    Connection::open(path).map_err(|e| {
        AppError::storage("DB_OPEN_FAILED", "Failed to open SQLite database")
            .with_details(e.to_string())
    })
}

pub fn open_in_memory() -> Result<Connection, AppError> {
    Connection::open_in_memory().map_err(|e| {
        AppError::storage("DB_OPEN_FAILED", "Failed to open in-memory SQLite database")
            .with_details(e.to_string())
    })
}

/// Per-connection settings for file-backed databases: WAL so readers never wait on the
/// writer, and a busy timeout so concurrent writers queue instead of failing outright.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<(), AppError> {
    conn.busy_timeout(busy_timeout).map_err(|e| {
        AppError::storage("DB_CONFIGURE_FAILED", "Failed to set busy timeout")
            .with_details(e.to_string())
    })?;

    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| {
            AppError::storage("DB_CONFIGURE_FAILED", "Failed to enable WAL journal mode")
                .with_details(e.to_string())
        })?;
    tracing::trace!(journal_mode = %mode, "configured connection");

    conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
        AppError::storage("DB_CONFIGURE_FAILED", "Failed to enable foreign keys")
            .with_details(e.to_string())
    })
}

pub fn migrate(conn: &mut Connection) -> Result<(), AppError> {
    // Track migrations by name, applying each exactly once, in deterministic order.
    conn.execute_batch(
        r#"
      CREATE TABLE IF NOT EXISTS _migrations (
        name TEXT PRIMARY KEY NOT NULL,
        applied_at TEXT NOT NULL
      );
    "#,
    )
    .map_err(|e| {
        AppError::storage(
            "DB_MIGRATIONS_TABLE_FAILED",
            "Failed to ensure migrations table exists",
        )
        .with_details(e.to_string())
    })?;

    let applied: HashSet<String> = {
        let mut stmt = conn.prepare("SELECT name FROM _migrations").map_err(|e| {
            AppError::storage(
                "DB_MIGRATIONS_QUERY_FAILED",
                "Failed to query applied migrations",
            )
            .with_details(e.to_string())
        })?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| {
                AppError::storage(
                    "DB_MIGRATIONS_QUERY_FAILED",
                    "Failed to read applied migrations",
                )
                .with_details(e.to_string())
            })?;

        let mut set = HashSet::new();
        for r in rows {
            set.insert(r.map_err(|e| {
                AppError::storage(
                    "DB_MIGRATIONS_QUERY_FAILED",
                    "Failed to read applied migration row",
                )
                .with_details(e.to_string())
            })?);
        }
        set
    };

    for (name, sql) in migrations() {
        if applied.contains(name) {
            continue;
        }

        let tx = conn.transaction().map_err(|e| {
            AppError::storage("DB_TX_FAILED", "Failed to start migration transaction")
                .with_details(e.to_string())
        })?;

        tx.execute_batch(sql).map_err(|e| {
            AppError::storage("DB_MIGRATION_FAILED", format!("Migration {name} failed"))
                .with_details(e.to_string())
        })?;

        tx.execute(
            "INSERT INTO _migrations(name, applied_at) VALUES (?1, strftime('%Y-%m-%d %H:%M:%S','now'))",
            [name],
        )
        .map_err(|e| {
            AppError::storage(
                "DB_MIGRATION_FAILED",
                format!("Failed to record migration {name}"),
            )
            .with_details(e.to_string())
        })?;

        tx.commit().map_err(|e| {
            AppError::storage("DB_TX_FAILED", "Failed to commit migration transaction")
                .with_details(e.to_string())
        })?;

        tracing::info!(migration = name, "applied migration");
    }

    Ok(())
}
