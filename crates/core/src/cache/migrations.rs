//! Database schema migrations.
//!
//! Applied versions are recorded in `_migrations`; each pending batch runs
//! inside its own transaction together with its version row.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Migration list: (version, name, SQL), in ascending version order.
const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "generations", include_str!("../../migrations/001_generations.sql")),
    (2, "entries", include_str!("../../migrations/002_entries.sql")),
];

/// Apply every migration newer than the recorded schema version.
///
/// Returns how many migrations ran.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the migration whose SQL failed.
pub async fn run(conn: &Connection) -> Result<usize, Error> {
    let applied = conn
        .call(|conn| -> Result<usize, Error> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    applied_at TEXT NOT NULL
                )",
                [],
            )?;

            let current: i64 =
                conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

            let mut applied = 0;
            for (version, name, sql) in MIGRATIONS.iter().filter(|(v, _, _)| *v > current) {
                let tx = conn.transaction()?;
                tx.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("{version:03}_{name}: {e}")))?;
                tx.execute(
                    "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                    params![version, name, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.commit()?;
                applied += 1;
            }

            Ok(applied)
        })
        .await
        .map_err(Error::from)?;

    if applied > 0 {
        tracing::info!(applied, "applied cache schema migrations");
    }

    Ok(applied)
}
