use std::fmt;
use std::str::FromStr;

use tracing::info;
use uuid::Uuid;

use super::{paired_failure, Pipeline};
use crate::error::{CrmError, CrmResult};
use crate::models::{Activity, ActivityType, Lead};

const PREVIEW_CHARS: usize = 50;

/// Outbound communication channel. Nothing is actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    WhatsApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::WhatsApp => "whatsapp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "whatsapp" | "wa" => Ok(Self::WhatsApp),
            other => Err(CrmError::InvalidPayload(format!(
                "unknown channel '{}' (expected email or whatsapp)",
                other
            ))),
        }
    }
}

impl Pipeline<'_> {
    /// Replace a lead's notes and log a `note` activity.
    pub fn update_notes(&self, lead_id: Uuid, notes: &str, actor: Option<Uuid>) -> CrmResult<Lead> {
        let notes = Some(notes.trim()).filter(|n| !n.is_empty());
        let lead = self.db.write_transaction(|db| {
            if !db.update_lead_notes(lead_id, notes)? {
                return Err(CrmError::LeadNotFound(lead_id));
            }
            db.append_activity(&Activity::notes_updated(lead_id, actor))
                .map_err(|e| paired_failure(lead_id, "notes update", e))?;
            db.get_lead(lead_id)?.ok_or(CrmError::LeadNotFound(lead_id))
        })?;
        info!(lead = %lead_id, "lead notes updated");
        Ok(lead)
    }

    /// Record an outbound message on the lead's activity log.
    pub fn log_communication(
        &self,
        lead_id: Uuid,
        channel: Channel,
        body: &str,
        actor: Option<Uuid>,
    ) -> CrmResult<Activity> {
        let body = body.trim();
        if body.is_empty() {
            return Err(CrmError::InvalidPayload("message body is empty".to_string()));
        }
        let lead = self
            .db
            .get_lead(lead_id)?
            .ok_or(CrmError::LeadNotFound(lead_id))?;

        let preview: String = body.chars().take(PREVIEW_CHARS).collect();
        let activity = match channel {
            Channel::Email => {
                let email = lead.email.as_deref().ok_or_else(|| {
                    CrmError::InvalidPayload(format!("lead {} has no email address", lead_id))
                })?;
                Activity::new(lead_id, actor, ActivityType::Email, "Email Sent")
                    .with_description(format!("Email sent to {}: {}...", email, preview))
            }
            Channel::WhatsApp => {
                let phone = lead.phone.as_deref().ok_or_else(|| {
                    CrmError::InvalidPayload(format!("lead {} has no phone number", lead_id))
                })?;
                Activity::new(lead_id, actor, ActivityType::Message, "WhatsApp Message Sent")
                    .with_description(format!("WhatsApp message sent to {}: {}...", phone, preview))
            }
        };

        self.db.append_activity(&activity)?;
        info!(lead = %lead_id, channel = %channel, "communication logged");
        Ok(activity)
    }
}
