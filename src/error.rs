//! Error taxonomy shared by the database layer and the lead pipeline.

use rusqlite::ErrorCode;
use thiserror::Error;
use uuid::Uuid;

pub type CrmResult<T> = std::result::Result<T, CrmError>;

#[derive(Debug, Error)]
pub enum CrmError {
    /// Malformed intake input. Dropped, never retried.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("no eligible agents in the directory")]
    NoEligibleAgents,

    #[error("agent {0} is not eligible for assignment")]
    AgentNotEligible(Uuid),

    /// Removing the agent would leave leads without an audited owner change.
    #[error("agent {agent} still owns {count} lead(s); reassign them first")]
    AgentOwnsLeads { agent: Uuid, count: u32 },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("lead {0} not found")]
    LeadNotFound(Uuid),

    #[error("reminder {0} not found")]
    ReminderNotFound(Uuid),

    /// The store rejected a write because of a uniqueness constraint.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("assignment cursor moved concurrently (expected position {expected})")]
    CursorContention { expected: i64 },

    #[error("storage timed out: {0}")]
    Timeout(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A paired write could not complete as a unit.
    #[error("atomicity violation: {0}")]
    AtomicityViolation(String),
}

impl CrmError {
    /// Transient failures the caller may retry. The core never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::StorageUnavailable(_)
                | Self::CursorContention { .. }
                | Self::Upstream(_)
        )
    }

    /// Validation errors rejected at the boundary before any side effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload(_)
                | Self::InvalidStatus(_)
                | Self::AgentNotEligible(_)
                | Self::AgentOwnsLeads { .. }
                | Self::LeadNotFound(_)
                | Self::ReminderNotFound(_)
        )
    }
}

impl From<rusqlite::Error> for CrmError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::UniqueViolation(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                Self::Timeout(err.to_string())
            }
            _ => Self::StorageUnavailable(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Upstream(err.to_string())
        }
    }
}
