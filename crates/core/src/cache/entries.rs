//! SQLite implementation of the cache generation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::SqliteCacheStore;
use super::hash::request_key;
use super::store::{CacheStore, EntryInfo};
use crate::{Error, GatewayRequest, StoredResponse};

/// Row shape written for one entry.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn build(request: &GatewayRequest, response: &StoredResponse) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;
        Ok(Self {
            key_hash: request_key(request),
            method: request.method.clone(),
            url: request.url.to_string(),
            status: i64::from(response.status),
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

fn ensure_generation(conn: &rusqlite::Connection, generation: &str, created_at: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![generation, created_at],
    )?;
    Ok(())
}

fn upsert(conn: &rusqlite::Connection, generation: &str, row: &EntryRow, stored_at: &str) -> Result<(), Error> {
    ensure_generation(conn, generation, stored_at)?;
    conn.execute(
        "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &row.key_hash,
            &row.method,
            &row.url,
            row.status,
            &row.headers_json,
            &row.body,
            stored_at,
        ],
    )?;
    Ok(())
}

fn parse_status(raw: i64) -> Result<u16, Error> {
    u16::try_from(raw).map_err(|_| Error::CorruptEntry(format!("status {raw} out of range")))
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn create(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_generation(conn, &generation, &now) })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, generation: &str, request: &GatewayRequest) -> Result<Option<StoredResponse>, Error> {
        let generation = generation.to_string();
        let key_hash = request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                match result {
                    Ok((status, headers_json, body)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
                        Ok(Some(StoredResponse::new(parse_status(status)?, headers, body)))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, generation: &str, request: &GatewayRequest, response: &StoredResponse) -> Result<(), Error> {
        let generation = generation.to_string();
        let row = EntryRow::build(request, response)?;
        let stored_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { upsert(conn, &generation, &row, &stored_at) })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, generation: &str, entries: &[(GatewayRequest, StoredResponse)]) -> Result<(), Error> {
        let generation = generation.to_string();
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::build(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let stored_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation, &stored_at)?;
                for row in &rows {
                    upsert(&tx, &generation, row, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let names = rows.collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, generation: &str) -> Result<Vec<EntryInfo>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status, stored_at
                     FROM entries WHERE generation = ?1 ORDER BY url",
                )?;
                let rows = stmt.query_map(params![generation], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?;

                let mut infos = Vec::new();
                for row in rows {
                    let (key_hash, method, url, status, stored_at) = row?;
                    let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                        .map_err(|e| Error::CorruptEntry(format!("stored_at: {e}")))?
                        .with_timezone(&Utc);
                    infos.push(EntryInfo { key_hash, method, url, status: parse_status(status)?, stored_at });
                }
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> StoredResponse {
        StoredResponse::new(200, vec![("content-type".into(), "text/html".into())], body.to_string())
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let db = SqliteCacheStore::open_in_memory().await.unwrap();
        let req = GatewayRequest::get("http://localhost:3000/").unwrap();

        db.put("super-tool-v1", &req, &page("<h1>home</h1>")).await.unwrap();

        let found = db.lookup("super-tool-v1", &req).await.unwrap().unwrap();
        assert_eq!(found.status, 200);
        assert_eq!(found.header("Content-Type"), Some("text/html"));
        assert_eq!(found.body.as_ref(), b"<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_lookup_missing() {
        let db = SqliteCacheStore::open_in_memory().await.unwrap();
        let req = GatewayRequest::get("http://localhost:3000/missing").unwrap();
        assert!(db.lookup("super-tool-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_last_write_wins() {
        let db = SqliteCacheStore::open_in_memory().await.unwrap();
        let req = GatewayRequest::get("http://localhost:3000/").unwrap();

        db.put("super-tool-v1", &req, &page("old")).await.unwrap();
        db.put("super-tool-v1", &req, &page("new")).await.unwrap();

        let found = db.lookup("super-tool-v1", &req).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"new");
        assert_eq!(db.entries("super-tool-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let db = SqliteCacheStore::open_in_memory().await.unwrap();
        let req = GatewayRequest::get("http://localhost:3000/").unwrap();

        db.put("super-tool-v1", &req, &page("v1")).await.unwrap();
        db.create("super-tool-v2").await.unwrap();

        assert!(db.lookup("super-tool-v2", &req).await.unwrap().is_none());
        assert_eq!(db.names().await.unwrap(), vec!["super-tool-v1", "super-tool-v2"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = SqliteCacheStore::open_in_memory().await.unwrap();
        let req = GatewayRequest::get("http://localhost:3000/").unwrap();
        db.put("super-tool-v1", &req, &page("v1")).await.unwrap();

        assert!(db.delete("super-tool-v1").await.unwrap());
        assert!(!db.delete("super-tool-v1").await.unwrap());

        db.create("super-tool-v1").await.unwrap();
        assert!(db.lookup("super-tool-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_all_and_entries() {
        let db = SqliteCacheStore::open_in_memory().await.unwrap();
        let batch = vec![
            (GatewayRequest::get("http://localhost:3000/manifest.json").unwrap(), page("{}")),
            (GatewayRequest::get("http://localhost:3000/").unwrap(), page("home")),
        ];

        db.put_all("super-tool-v1", &batch).await.unwrap();

        let entries = db.entries("super-tool-v1").await.unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["http://localhost:3000/", "http://localhost:3000/manifest.json"]);
        assert!(entries.iter().all(|e| e.method == "GET" && e.status == 200));
    }

    #[tokio::test]
    async fn test_put_all_empty_batch_creates_generation() {
        let db = SqliteCacheStore::open_in_memory().await.unwrap();

        db.put_all("super-tool-v1", &[]).await.unwrap();

        assert_eq!(db.names().await.unwrap(), vec!["super-tool-v1"]);
        assert!(db.entries("super-tool-v1").await.unwrap().is_empty());
    }
}
