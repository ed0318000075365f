//! Database operations for intake gateway API keys.

use chrono::{DateTime, Utc};
use rusqlite::Row;

use super::{format_datetime, parse_datetime, Database};
use crate::error::CrmResult;

/// API key stored in database
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

const API_KEY_COLUMNS: &str =
    "id, name, key_hash, key_prefix, created_at, last_used_at, revoked_at";

impl Database {
    pub fn insert_api_key(
        &self,
        id: &str,
        name: &str,
        key_hash: &str,
        key_prefix: &str,
    ) -> CrmResult<()> {
        let now = format_datetime(&Utc::now());
        self.conn.execute(
            "INSERT INTO api_keys (id, name, key_hash, key_prefix, created_at) VALUES (?, ?, ?, ?, ?)",
            rusqlite::params![id, name, key_hash, key_prefix, now],
        )?;
        Ok(())
    }

    /// Find API key by hash (for authentication)
    pub fn find_api_key_by_hash(&self, key_hash: &str) -> CrmResult<Option<ApiKey>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM api_keys WHERE key_hash = ?", API_KEY_COLUMNS),
            [key_hash],
            row_to_api_key,
        );

        match result {
            Ok(key) => Ok(Some(key)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_api_keys(&self) -> CrmResult<Vec<ApiKey>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM api_keys ORDER BY created_at DESC",
            API_KEY_COLUMNS
        ))?;
        let keys = stmt
            .query_map([], row_to_api_key)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }

    pub fn touch_api_key(&self, id: &str) -> CrmResult<()> {
        let now = format_datetime(&Utc::now());
        self.conn.execute(
            "UPDATE api_keys SET last_used_at = ? WHERE id = ?",
            rusqlite::params![now, id],
        )?;
        Ok(())
    }

    /// Revoke by id or display prefix. Returns false if nothing active matched.
    pub fn revoke_api_key(&self, id_or_prefix: &str) -> CrmResult<bool> {
        let now = format_datetime(&Utc::now());
        let rows = self.conn.execute(
            "UPDATE api_keys SET revoked_at = ?1
             WHERE (id = ?2 OR key_prefix = ?2) AND revoked_at IS NULL",
            rusqlite::params![now, id_or_prefix],
        )?;
        Ok(rows > 0)
    }
}

fn row_to_api_key(row: &Row) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: row.get(0)?,
        name: row.get(1)?,
        key_hash: row.get(2)?,
        key_prefix: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
        last_used_at: row
            .get::<_, Option<String>>(5)?
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
        revoked_at: row
            .get::<_, Option<String>>(6)?
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
    })
}
