use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A follow-up reminder on a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(lead_id: Uuid, user_id: Uuid, title: String, due_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id,
            user_id,
            title,
            description: None,
            due_date,
            completed: false,
            created_at: Utc::now(),
        }
    }

    /// Overdue is derived, never stored.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let mut reminder = Reminder::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Call back".to_string(),
            now - Duration::hours(1),
        );
        assert!(reminder.is_overdue(now));

        reminder.completed = true;
        assert!(!reminder.is_overdue(now));
    }

    #[test]
    fn test_future_reminder_not_overdue() {
        let now = Utc::now();
        let reminder = Reminder::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Send quote".to_string(),
            now + Duration::days(2),
        );
        assert!(!reminder.completed);
        assert!(!reminder.is_overdue(now));
    }
}
