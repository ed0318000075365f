use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LeadSource;

/// User-facing notification. The core only ever writes these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, lead_id: Option<Uuid>, title: &str, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            lead_id,
            title: title.to_string(),
            message,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn lead_assigned(agent_id: Uuid, lead_id: Uuid, source: LeadSource, name: &str) -> Self {
        Self::new(
            agent_id,
            Some(lead_id),
            "New Lead Assigned",
            format!("New lead from {}: {}", source.display_name(), name),
        )
    }

    pub fn lead_reassigned(agent_id: Uuid, lead_id: Uuid) -> Self {
        Self::new(
            agent_id,
            Some(lead_id),
            "New Lead Assigned",
            "A new lead has been assigned to you".to_string(),
        )
    }

    pub fn reminder_set(user_id: Uuid, lead_id: Uuid, title: &str) -> Self {
        Self::new(
            user_id,
            Some(lead_id),
            "New Reminder",
            format!("Reminder set for {}", title),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_assigned_message() {
        let n = Notification::lead_assigned(
            Uuid::new_v4(),
            Uuid::new_v4(),
            LeadSource::Facebook,
            "Bob",
        );
        assert_eq!(n.title, "New Lead Assigned");
        assert_eq!(n.message, "New lead from Facebook Ads: Bob");
        assert!(!n.is_read);
    }
}
