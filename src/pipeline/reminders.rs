use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::Pipeline;
use crate::error::{CrmError, CrmResult};
use crate::models::{Notification, Reminder};

impl Pipeline<'_> {
    /// Store a reminder and notify its owner.
    pub fn create_reminder(
        &self,
        lead_id: Uuid,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        due_date: DateTime<Utc>,
    ) -> CrmResult<Reminder> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CrmError::InvalidPayload("reminder title is required".to_string()));
        }

        let mut reminder = Reminder::new(lead_id, user_id, title.to_string(), due_date);
        reminder.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        let notification = self.db.write_transaction(|db| {
            if db.get_lead(lead_id)?.is_none() {
                return Err(CrmError::LeadNotFound(lead_id));
            }
            db.insert_reminder(&reminder)?;
            let n = Notification::reminder_set(user_id, lead_id, &reminder.title);
            db.insert_notification(&n)?;
            Ok(n)
        })?;

        info!(lead = %lead_id, reminder = %reminder.id, due = %due_date, "reminder set");
        self.relay(&[notification]);
        Ok(reminder)
    }

    /// Flip a reminder between done and not done. Returns the new state.
    pub fn toggle_reminder(&self, id: Uuid) -> CrmResult<bool> {
        self.db
            .toggle_reminder(id)?
            .ok_or(CrmError::ReminderNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Lead, LeadSource};
    use chrono::Duration;

    #[test]
    fn test_create_reminder_notifies_owner() {
        let db = Database::open_memory().unwrap();
        let lead = Lead::new("Bob".to_string(), LeadSource::Manual);
        db.insert_lead(&lead).unwrap();
        let owner = Uuid::new_v4();
        let pipeline = Pipeline::new(&db);

        let due = Utc::now() + Duration::days(1);
        let reminder = pipeline
            .create_reminder(lead.id, owner, "Call back", Some("  "), due)
            .unwrap();
        assert!(!reminder.completed);
        assert_eq!(reminder.description, None);

        let inbox = db.list_notifications(owner, 10).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "New Reminder");
        assert_eq!(inbox[0].message, "Reminder set for Call back");
        assert_eq!(db.list_reminders(lead.id).unwrap().len(), 1);
    }

    #[test]
    fn test_create_reminder_for_missing_lead() {
        let db = Database::open_memory().unwrap();
        let err = Pipeline::new(&db)
            .create_reminder(Uuid::new_v4(), Uuid::new_v4(), "Call", None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CrmError::LeadNotFound(_)));
        assert_eq!(db.count_notifications().unwrap(), 0);
    }

    #[test]
    fn test_toggle_reminder() {
        let db = Database::open_memory().unwrap();
        let lead = Lead::new("Bob".to_string(), LeadSource::Manual);
        db.insert_lead(&lead).unwrap();
        let pipeline = Pipeline::new(&db);
        let reminder = pipeline
            .create_reminder(lead.id, Uuid::new_v4(), "Quote", None, Utc::now())
            .unwrap();

        assert!(pipeline.toggle_reminder(reminder.id).unwrap());
        assert!(!pipeline.toggle_reminder(reminder.id).unwrap());
        assert!(matches!(
            pipeline.toggle_reminder(Uuid::new_v4()),
            Err(CrmError::ReminderNotFound(_))
        ));
    }
}
