use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{CrmError, CrmResult};

mod activities;
mod agents;
pub mod api_keys;
mod leads;
mod notifications;
mod reminders;
mod schema;
mod settings;

pub use leads::LeadStats;
pub use schema::SCHEMA_VERSION;

/// Environment variable overriding the database location.
pub const ENV_DB_PATH: &str = "LEADCMD_DB";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open database, creating if needed, running migrations
    pub fn open() -> CrmResult<Self> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> CrmResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CrmError::StorageUnavailable(format!("{}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;

        let db = Self {
            conn,
            path: Some(path),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open in-memory database for testing
    pub fn open_memory() -> CrmResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    /// File backing this connection; None for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bound how long a write waits on another writer before failing with `Timeout`.
    pub fn set_busy_timeout(&self, timeout: Duration) -> CrmResult<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    #[allow(dead_code)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn default_path() -> CrmResult<PathBuf> {
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CrmError::Config("could not find config directory".to_string()))?;
        Ok(config_dir.join("leadcmd").join("leads.db"))
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so writers sharing the database file
    /// are serialized. Any error from `f` rolls back every statement it issued.
    /// Must not be nested.
    pub(crate) fn write_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> CrmResult<T>,
    ) -> CrmResult<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    return Err(CrmError::AtomicityViolation(format!(
                        "{}; rollback failed: {}",
                        err, rollback_err
                    )));
                }
                Err(err)
            }
        }
    }

    fn migrate(&self) -> CrmResult<()> {
        let version = self.get_schema_version()?;

        if version < 1 {
            // Run migration in a transaction for atomicity
            self.conn
                .execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", schema::SCHEMA_V1))?;
            self.set_schema_version(1)?;
        }

        if version < 2 {
            self.conn.execute_batch(&format!(
                "BEGIN TRANSACTION; {} COMMIT;",
                schema::MIGRATION_V2
            ))?;
            self.set_schema_version(2)?;
        }

        Ok(())
    }

    fn get_schema_version(&self) -> CrmResult<i32> {
        let result: Result<i32, _> =
            self.conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                    row.get(0)
                });

        match result {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(rusqlite::Error::SqliteFailure(err, msg)) => {
                // "no such table" is error code 1 (SQLITE_ERROR)
                if err.code == rusqlite::ErrorCode::Unknown
                    && msg.as_ref().map_or(false, |m| m.contains("no such table"))
                {
                    Ok(0)
                } else {
                    Err(rusqlite::Error::SqliteFailure(err, msg).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_schema_version(&self, version: i32) -> CrmResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
            [version],
        )?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Helper to convert UUID parse errors to rusqlite errors
pub(crate) fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_opt_uuid(s: Option<String>) -> rusqlite::Result<Option<Uuid>> {
    s.as_deref().map(parse_uuid).transpose()
}
