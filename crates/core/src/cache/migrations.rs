//! Schema versioning for the cache database.
//!
//! Each migration runs in its own transaction together with the row that
//! records it in `schema_version`, so a failed migration leaves neither.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

/// One forward-only schema step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Applied in ascending `version` order.
pub(crate) const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "cache_entries",
    sql: include_str!("../../migrations/001_cache_entries.sql"),
}];

/// Bring the schema up to the latest version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    apply(conn, MIGRATIONS).await
}

pub(crate) async fn apply(conn: &Connection, migrations: &'static [Migration]) -> Result<(), Error> {
    let applied = conn
        .call(move |conn| -> Result<Vec<i64>, Error> {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    applied_at TEXT NOT NULL
                )",
            )?;
            let current: i64 =
                conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;

            let mut applied = Vec::new();
            for migration in migrations.iter().filter(|m| m.version > current) {
                apply_one(conn, migration).map_err(|e| {
                    Error::MigrationFailed(format!("{} ({}): {e}", migration.version, migration.name))
                })?;
                applied.push(migration.version);
            }
            Ok(applied)
        })
        .await
        .map_err(Error::from)?;

    if !applied.is_empty() {
        tracing::info!(?applied, "applied cache schema migrations");
    }
    Ok(())
}

fn apply_one(conn: &mut rusqlite::Connection, migration: &Migration) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
    )?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, table: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [table],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    async fn versions(conn: &Connection) -> Vec<i64> {
        conn.call(|conn| -> Result<Vec<i64>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT version FROM schema_version ORDER BY version")?;
            stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<i64>, _>>()
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_versions_ascend() {
        assert!(MIGRATIONS.windows(2).all(|pair| pair[0].version < pair[1].version));
        assert!(MIGRATIONS.iter().all(|m| m.version > 0));
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert!(table_exists(&conn, "cache_entries").await);
        let expected: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert_eq!(versions(&conn).await, expected);
    }

    #[tokio::test]
    async fn test_failed_migration_rolls_back() {
        static BROKEN: &[Migration] = &[
            Migration { version: 1, name: "ok", sql: "CREATE TABLE first (id INTEGER);" },
            Migration { version: 2, name: "broken", sql: "CREATE TABLE second (id INTEGER); NOT SQL;" },
        ];
        let conn = Connection::open_in_memory().await.unwrap();

        let result = apply(&conn, BROKEN).await;

        assert!(matches!(result, Err(Error::MigrationFailed(msg)) if msg.starts_with("2 (broken)")));
        assert!(table_exists(&conn, "first").await);
        assert!(!table_exists(&conn, "second").await);
        assert_eq!(versions(&conn).await, vec![1]);
    }

    #[tokio::test]
    async fn test_later_migrations_apply_on_top() {
        static V1: &[Migration] = &[Migration { version: 1, name: "one", sql: "CREATE TABLE one (id INTEGER);" }];
        static V2: &[Migration] = &[
            Migration { version: 1, name: "one", sql: "CREATE TABLE one (id INTEGER);" },
            Migration { version: 2, name: "two", sql: "CREATE TABLE two (id INTEGER);" },
        ];
        let conn = Connection::open_in_memory().await.unwrap();

        apply(&conn, V1).await.unwrap();
        apply(&conn, V2).await.unwrap();

        assert!(table_exists(&conn, "two").await);
        assert_eq!(versions(&conn).await, vec![1, 2]);
    }
}
