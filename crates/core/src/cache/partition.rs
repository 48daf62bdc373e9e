//! Partition CRUD operations.
//!
//! A partition is a named scope inside the cache database. Every statement is
//! filtered by `cache_name`, so entries never leak across partitions.
//! Keys are opaque strings here; strategies derive them with `CacheKey`.

use std::sync::Arc;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use crate::{Error, Response};

/// A stored response plus its bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub cache_name: String,
    pub cache_key: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub body_sha256: String,
    pub stored_at: String,
}

impl CacheEntry {
    /// The stored response, unmodified.
    pub fn into_response(self) -> Response {
        Response { url: self.url, status: self.status, headers: self.headers, body: self.body }
    }
}

/// Handle on one named partition of the cache database.
#[derive(Debug, Clone)]
pub struct Partition {
    db: CacheDb,
    name: Arc<str>,
}

impl Partition {
    pub(crate) fn new(db: CacheDb, name: String) -> Self {
        Self { db, name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an entry by key.
    ///
    /// Returns None if the key is not stored in this partition.
    pub async fn match_key(&self, key: impl AsRef<str>) -> Result<Option<CacheEntry>, Error> {
        let name = self.name.to_string();
        let key = key.as_ref().to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_key, url, status, headers_json, body, body_sha256, stored_at
                    FROM cache_entries WHERE cache_name = ?1 AND cache_key = ?2",
                )?;

                let result = stmt.query_row(params![name, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((cache_key, url, status, headers_json, body, body_sha256, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::InvalidCacheKey(format!("{cache_key}: corrupt headers: {e}")))?;
                        Ok(Some(CacheEntry {
                            cache_name: name,
                            cache_key,
                            url,
                            status,
                            headers,
                            body: Bytes::from(body),
                            body_sha256,
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under a key.
    ///
    /// Uses UPSERT semantics: last write wins, and writing identical content
    /// twice leaves a single entry.
    pub async fn put(&self, key: impl AsRef<str>, response: &Response) -> Result<(), Error> {
        let name = self.name.to_string();
        let key = key.as_ref().to_string();
        let url = response.url.clone();
        let status = response.status;
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to serialize headers: {e}")))?;
        let body = response.body.to_vec();
        let body_sha256 = hex::encode(Sha256::digest(&body));
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (
                    cache_name, cache_key, url, status, headers_json, body, body_sha256, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(cache_name, cache_key) DO UPDATE SET
                    url = excluded.url,
                    status = excluded.status,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    body_sha256 = excluded.body_sha256,
                    stored_at = excluded.stored_at",
                    params![name, key, url, status, headers_json, body, body_sha256, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All keys stored in this partition, in insertion-independent order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT cache_key FROM cache_entries WHERE cache_name = ?1 ORDER BY cache_key")?;
                let keys = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry by its raw stored key.
    ///
    /// Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let name = self.name.to_string();
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND cache_key = ?2",
                    params![name, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry in this partition.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear(&self) -> Result<u64, Error> {
        let name = self.name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this partition.
    pub async fn len(&self) -> Result<u64, Error> {
        let name = self.name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
