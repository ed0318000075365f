use rusqlite::{params, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_opt_uuid, parse_uuid, Database};
use crate::error::CrmResult;
use crate::models::Notification;

impl Database {
    pub fn insert_notification(&self, notification: &Notification) -> CrmResult<()> {
        self.conn.execute(
            "INSERT INTO notifications (id, user_id, lead_id, title, message, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                notification.id.to_string(),
                notification.user_id.to_string(),
                notification.lead_id.map(|l| l.to_string()),
                notification.title,
                notification.message,
                notification.is_read as i32,
                format_datetime(&notification.created_at),
            ],
        )?;
        Ok(())
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: Uuid, limit: u32) -> CrmResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, lead_id, title, message, is_read, created_at
             FROM notifications WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )?;
        let list = stmt
            .query_map(params![user_id.to_string(), limit], row_to_notification)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(list)
    }

    pub fn count_notifications(&self) -> CrmResult<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
        lead_id: parse_opt_uuid(row.get(2)?)?,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}
