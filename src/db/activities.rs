use rusqlite::{params, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_opt_uuid, parse_uuid, Database};
use crate::error::CrmResult;
use crate::models::{Activity, ActivityType};

impl Database {
    /// Append to the audit log. There is deliberately no update or delete.
    pub fn append_activity(&self, activity: &Activity) -> CrmResult<()> {
        self.conn.execute(
            "INSERT INTO activities (id, lead_id, user_id, activity_type, title, description, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                activity.id.to_string(),
                activity.lead_id.to_string(),
                activity.user_id.map(|u| u.to_string()),
                activity.activity_type.as_str(),
                activity.title,
                activity.description,
                format_datetime(&activity.created_at),
            ],
        )?;
        Ok(())
    }

    /// Newest first.
    pub fn list_activities(&self, lead_id: Uuid) -> CrmResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lead_id, user_id, activity_type, title, description, created_at
             FROM activities WHERE lead_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let activities = stmt
            .query_map([lead_id.to_string()], row_to_activity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(activities)
    }

    pub fn count_activities(&self, lead_id: Uuid, activity_type: ActivityType) -> CrmResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM activities WHERE lead_id = ? AND activity_type = ?",
            params![lead_id.to_string(), activity_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_activity(row: &Row) -> rusqlite::Result<Activity> {
    let type_str: String = row.get(3)?;
    let activity_type = ActivityType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown activity type: {}", type_str).into(),
        )
    })?;

    Ok(Activity {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        lead_id: parse_uuid(&row.get::<_, String>(1)?)?,
        user_id: parse_opt_uuid(row.get(2)?)?,
        activity_type,
        title: row.get(4)?,
        description: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}
