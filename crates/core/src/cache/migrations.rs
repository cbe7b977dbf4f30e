//! Schema for the SQLite cache backend.
//!
//! `cache_entries` holds one row per fingerprint, with `written_at` as the unix
//! timestamp the TTL is measured against. `cache_meta` holds the purge marker.
//! The applied schema version lives in `PRAGMA user_version`.

use super::Error;
use tokio_rusqlite::Connection;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Applied in ascending version order, one transaction each.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "cache_entries",
    sql: include_str!("../../migrations/001_cache_entries.sql"),
}];

/// Bring the cache schema up to the latest version.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] naming the migration whose SQL failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let applied: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
            tracing::debug!(version = migration.version, name = migration.name, "applying cache schema");
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{}: {}", migration.name, e)))?;
            tx.pragma_update(None, "user_version", migration.version)?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_schema_created_once() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert!(table_exists(&conn, "cache_entries").await);
        assert!(table_exists(&conn, "cache_meta").await);
    }

    #[tokio::test]
    async fn test_user_version_tracks_latest_migration() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let version: i64 = conn
            .call(|conn| conn.pragma_query_value(None, "user_version", |row| row.get(0)))
            .await
            .unwrap();

        assert_eq!(version, MIGRATIONS.last().map(|m| m.version).unwrap_or(0));
    }
}
