use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LeadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    StatusChange,
    Assignment,
    Note,
    Email,
    Message,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChange => "status_change",
            Self::Assignment => "assignment",
            Self::Note => "note",
            Self::Email => "email",
            Self::Message => "message",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "status_change" => Some(Self::StatusChange),
            "assignment" => Some(Self::Assignment),
            "note" => Some(Self::Note),
            "email" => Some(Self::Email),
            "message" => Some(Self::Message),
            _ => None,
        }
    }
}

/// Append-only audit entry attached to a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub lead_id: Uuid,
    /// None for system-generated entries.
    pub user_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        lead_id: Uuid,
        user_id: Option<Uuid>,
        activity_type: ActivityType,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id,
            user_id,
            activity_type,
            title: title.into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status_change(lead_id: Uuid, actor: Option<Uuid>, status: LeadStatus) -> Self {
        Self::new(lead_id, actor, ActivityType::StatusChange, "Status Changed")
            .with_description(format!("Status changed to {}", status.label()))
    }

    pub fn assignment(lead_id: Uuid, actor: Option<Uuid>, agent_name: &str) -> Self {
        Self::new(lead_id, actor, ActivityType::Assignment, "Lead Reassigned")
            .with_description(format!("Lead assigned to {}", agent_name))
    }

    pub fn notes_updated(lead_id: Uuid, actor: Option<Uuid>) -> Self {
        Self::new(lead_id, actor, ActivityType::Note, "Notes Updated")
            .with_description("Lead notes were updated")
    }
}
