//! Lead pipeline: intake, round-robin assignment, status transitions and
//! the other operations that pair a lead write with an audit record.
//!
//! Every paired write runs inside one `BEGIN IMMEDIATE` transaction, so a
//! failure on either half leaves the database as it was. Notifications are
//! stored in the same transaction; the optional relay only sees them after
//! commit.

mod assignment;
mod directory;
mod intake;
mod manual;
mod notes;
mod reassign;
pub mod relay;
mod reminders;
mod transition;

pub use assignment::{assign_next, select_next_agent};
pub use intake::{IntakeOutcome, IntakeReport, ItemOutcome, RawLead, DEFAULT_CAMPAIGN};
pub use manual::NewLead;
pub use notes::Channel;
pub use relay::NotificationRelay;

use uuid::Uuid;

use crate::db::Database;
use crate::error::CrmError;
use crate::models::Notification;

pub struct Pipeline<'a> {
    db: &'a Database,
    relay: Option<NotificationRelay>,
}

impl<'a> Pipeline<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db, relay: None }
    }

    pub fn with_relay(mut self, relay: Option<NotificationRelay>) -> Self {
        self.relay = relay;
        self
    }

    pub fn db(&self) -> &Database {
        self.db
    }

    /// Hand committed notifications to the relay, if one is configured.
    fn relay(&self, notifications: &[Notification]) {
        if let Some(relay) = &self.relay {
            for n in notifications {
                relay.deliver(n);
            }
        }
    }
}

/// Error for the second half of a paired write.
///
/// The transaction rolls back either way. Lock timeouts stay retryable;
/// anything else means the pair could not be recorded together.
fn paired_failure(lead_id: Uuid, what: &str, err: CrmError) -> CrmError {
    match err {
        CrmError::Timeout(_) => err,
        other => CrmError::AtomicityViolation(format!(
            "{} for lead {} not recorded, lead left unchanged: {}",
            what, lead_id, other
        )),
    }
}
