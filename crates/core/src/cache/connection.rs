//! SQLite connection setup for the generation store.
//!
//! Every connection gets WAL journaling and enforced foreign keys (deleting
//! a generation cascades to its entries) before pending migrations run.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// SQLite-backed cache generation store.
///
/// Generations and their entries live in one database file, so a later
/// process sees what an earlier install wrote. Statements run on
/// tokio-rusqlite's connection thread.
#[derive(Clone, Debug)]
pub struct SqliteCacheStore {
    pub(crate) conn: Connection,
}

impl SqliteCacheStore {
    /// Open (or create) the store file at `path` and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Store that lives only as long as this handle. Nothing reaches disk.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}
