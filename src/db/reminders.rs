use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid, Database};
use crate::error::CrmResult;
use crate::models::Reminder;

const REMINDER_COLUMNS: &str =
    "id, lead_id, user_id, title, description, due_date, completed, created_at";

impl Database {
    pub fn insert_reminder(&self, reminder: &Reminder) -> CrmResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO reminders ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                REMINDER_COLUMNS
            ),
            params![
                reminder.id.to_string(),
                reminder.lead_id.to_string(),
                reminder.user_id.to_string(),
                reminder.title,
                reminder.description,
                format_datetime(&reminder.due_date),
                reminder.completed as i32,
                format_datetime(&reminder.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_reminder(&self, id: Uuid) -> CrmResult<Option<Reminder>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM reminders WHERE id = ?", REMINDER_COLUMNS),
            [id.to_string()],
            row_to_reminder,
        );
        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Reminders for a lead, soonest due first.
    pub fn list_reminders(&self, lead_id: Uuid) -> CrmResult<Vec<Reminder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reminders WHERE lead_id = ? ORDER BY due_date ASC",
            REMINDER_COLUMNS
        ))?;
        let reminders = stmt
            .query_map([lead_id.to_string()], row_to_reminder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reminders)
    }

    /// Incomplete reminders due before `now`.
    pub fn list_overdue_reminders(&self, now: DateTime<Utc>) -> CrmResult<Vec<Reminder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reminders WHERE completed = 0 AND due_date < ? ORDER BY due_date ASC",
            REMINDER_COLUMNS
        ))?;
        let reminders = stmt
            .query_map([format_datetime(&now)], row_to_reminder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reminders)
    }

    /// Flip the completed flag. Returns the new value, or None if no such reminder.
    pub fn toggle_reminder(&self, id: Uuid) -> CrmResult<Option<bool>> {
        let rows = self.conn.execute(
            "UPDATE reminders SET completed = 1 - completed WHERE id = ?",
            [id.to_string()],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        let completed: bool = self.conn.query_row(
            "SELECT completed FROM reminders WHERE id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(Some(completed))
    }
}

fn row_to_reminder(row: &Row) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        lead_id: parse_uuid(&row.get::<_, String>(1)?)?,
        user_id: parse_uuid(&row.get::<_, String>(2)?)?,
        title: row.get(3)?,
        description: row.get(4)?,
        due_date: parse_datetime(&row.get::<_, String>(5)?)?,
        completed: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}
