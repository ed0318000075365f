use chrono::Utc;
use rusqlite::{params, Row};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{format_datetime, parse_date, parse_datetime, parse_opt_uuid, parse_uuid, Database};
use crate::error::CrmResult;
use crate::models::{Lead, LeadSource, LeadStatus};

const LEAD_COLUMNS: &str = "id, name, email, phone, source, campaign, status, assigned_to, \
     destination, guests, notes, check_in_date, created_by, created_at, updated_at";

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadStats {
    pub total: u32,
    pub new_leads: u32,
    pub converted: u32,
    /// Percentage with one decimal, e.g. "12.5".
    pub conversion_rate: String,
}

impl Database {
    // ==================== LEAD CREATE ====================

    pub fn insert_lead(&self, lead: &Lead) -> CrmResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO leads ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                LEAD_COLUMNS
            ),
            params![
                lead.id.to_string(),
                lead.name,
                lead.email,
                lead.phone,
                lead.source.as_str(),
                lead.campaign,
                lead.status.as_str(),
                lead.assigned_to.map(|id| id.to_string()),
                lead.destination,
                lead.guests,
                lead.notes,
                lead.check_in_date.map(|d| d.format("%Y-%m-%d").to_string()),
                lead.created_by.map(|id| id.to_string()),
                format_datetime(&lead.created_at),
                format_datetime(&lead.updated_at),
            ],
        )?;
        Ok(())
    }

    // ==================== LEAD READ ====================

    pub fn get_lead(&self, id: Uuid) -> CrmResult<Option<Lead>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS))?;

        match stmt.query_row([id.to_string()], Self::row_to_lead) {
            Ok(lead) => Ok(Some(lead)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Leads whose id starts with `prefix`, for short identifiers on the command line.
    pub fn find_leads_by_id_prefix(&self, prefix: &str) -> CrmResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM leads WHERE id LIKE ? || '%' ORDER BY created_at DESC LIMIT 10",
            LEAD_COLUMNS
        ))?;
        let leads = stmt
            .query_map([prefix.to_lowercase()], Self::row_to_lead)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leads)
    }

    /// Dedup lookup. Both keys must already be normalized; an absent key never matches.
    pub fn find_lead_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> CrmResult<Option<Lead>> {
        if email.is_none() && phone.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT {} FROM leads
               WHERE (?1 IS NOT NULL AND email = ?1)
                  OR (?2 IS NOT NULL AND phone = ?2)
               ORDER BY created_at ASC
               LIMIT 1"#,
            LEAD_COLUMNS
        ))?;

        match stmt.query_row(params![email, phone], Self::row_to_lead) {
            Ok(lead) => Ok(Some(lead)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_leads_by_status(&self, status: LeadStatus) -> CrmResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM leads WHERE status = ? ORDER BY created_at DESC",
            LEAD_COLUMNS
        ))?;

        let leads = stmt
            .query_map([status.as_str()], Self::row_to_lead)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leads)
    }

    /// Newest first. `search` matches name or email, case-insensitively.
    pub fn list_leads(&self, search: Option<&str>, limit: u32, offset: u32) -> CrmResult<Vec<Lead>> {
        let pattern = search
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT {} FROM leads
               WHERE ?1 IS NULL OR lower(name) LIKE ?1 OR lower(email) LIKE ?1
               ORDER BY created_at DESC
               LIMIT ?2 OFFSET ?3"#,
            LEAD_COLUMNS
        ))?;

        let leads = stmt
            .query_map(params![pattern, limit, offset], Self::row_to_lead)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leads)
    }

    pub fn list_leads_assigned_to(&self, agent_id: Uuid) -> CrmResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM leads WHERE assigned_to = ? ORDER BY created_at DESC",
            LEAD_COLUMNS
        ))?;
        let leads = stmt
            .query_map([agent_id.to_string()], Self::row_to_lead)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leads)
    }

    pub fn count_leads_assigned_to(&self, agent_id: Uuid) -> CrmResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM leads WHERE assigned_to = ?",
            [agent_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_leads(&self) -> CrmResult<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Lead count per stage, every stage present (zero when empty).
    pub fn count_leads_by_status(&self) -> CrmResult<Vec<(LeadStatus, u32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM leads GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let counts: HashMap<String, u32> = rows.into_iter().collect();
        Ok(LeadStatus::ALL
            .iter()
            .map(|s| (*s, counts.get(s.as_str()).copied().unwrap_or(0)))
            .collect())
    }

    pub fn lead_stats(&self) -> CrmResult<LeadStats> {
        let counts = self.count_leads_by_status()?;
        let total: u32 = counts.iter().map(|(_, n)| n).sum();
        let count_of = |status: LeadStatus| {
            counts
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };
        let new_leads = count_of(LeadStatus::New);
        let converted = count_of(LeadStatus::Converted);
        let conversion_rate = if total > 0 {
            format!("{:.1}", converted as f64 / total as f64 * 100.0)
        } else {
            "0".to_string()
        };

        Ok(LeadStats {
            total,
            new_leads,
            converted,
            conversion_rate,
        })
    }

    // ==================== LEAD UPDATE ====================

    /// Returns false when no lead has this id.
    pub fn update_lead_status(&self, id: Uuid, status: LeadStatus) -> CrmResult<bool> {
        let rows = self.conn.execute(
            "UPDATE leads SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), format_datetime(&Utc::now()), id.to_string()],
        )?;
        Ok(rows > 0)
    }

    pub fn update_lead_assignee(&self, id: Uuid, agent_id: Option<Uuid>) -> CrmResult<bool> {
        let rows = self.conn.execute(
            "UPDATE leads SET assigned_to = ?, updated_at = ? WHERE id = ?",
            params![
                agent_id.map(|a| a.to_string()),
                format_datetime(&Utc::now()),
                id.to_string()
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn update_lead_notes(&self, id: Uuid, notes: Option<&str>) -> CrmResult<bool> {
        let rows = self.conn.execute(
            "UPDATE leads SET notes = ?, updated_at = ? WHERE id = ?",
            params![notes, format_datetime(&Utc::now()), id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ==================== ROUND-ROBIN CURSOR ====================

    /// Last assigned position; -1 before the first assignment.
    pub fn assignment_cursor(&self) -> CrmResult<i64> {
        let position: i64 = self.conn.query_row(
            "SELECT position FROM assignment_cursor WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(position)
    }

    /// Move the cursor from `expected` to `new`. Returns false if it had moved.
    pub fn compare_and_swap_cursor(&self, expected: i64, new: i64) -> CrmResult<bool> {
        let rows = self.conn.execute(
            "UPDATE assignment_cursor SET position = ?1 WHERE id = 1 AND position = ?2",
            params![new, expected],
        )?;
        Ok(rows == 1)
    }

    fn row_to_lead(row: &Row) -> rusqlite::Result<Lead> {
        Ok(Lead {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            source: LeadSource::parse(&row.get::<_, String>(4)?),
            campaign: row.get(5)?,
            // The CHECK constraint keeps stored statuses canonical.
            status: LeadStatus::parse(&row.get::<_, String>(6)?).unwrap_or_default(),
            assigned_to: parse_opt_uuid(row.get(7)?)?,
            destination: row.get(8)?,
            guests: row.get(9)?,
            notes: row.get(10)?,
            check_in_date: row
                .get::<_, Option<String>>(11)?
                .as_deref()
                .map(parse_date)
                .transpose()?,
            created_by: parse_opt_uuid(row.get(12)?)?,
            created_at: parse_datetime(&row.get::<_, String>(13)?)?,
            updated_at: parse_datetime(&row.get::<_, String>(14)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrmError;
    use chrono::NaiveDate;

    fn lead(name: &str, email: Option<&str>, phone: Option<&str>) -> Lead {
        let mut lead = Lead::new(name.to_string(), LeadSource::Facebook);
        lead.email = email.map(String::from);
        lead.phone = phone.map(String::from);
        lead
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_memory().unwrap();
        let mut l = lead("Bob", Some("bob@x.com"), Some("+15551234567"));
        l.guests = Some(4);
        l.destination = Some("Lisbon".to_string());
        l.check_in_date = NaiveDate::from_ymd_opt(2026, 12, 1);
        db.insert_lead(&l).unwrap();

        let found = db.get_lead(l.id).unwrap().unwrap();
        assert_eq!(found.name, "Bob");
        assert_eq!(found.guests, Some(4));
        assert_eq!(found.check_in_date, l.check_in_date);
        assert_eq!(found.status, LeadStatus::New);
        assert_eq!(found.source, LeadSource::Facebook);
        assert!(db.get_lead(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_find_by_email_or_phone() {
        let db = Database::open_memory().unwrap();
        let l = lead("Bob", Some("bob@x.com"), Some("5551234567"));
        db.insert_lead(&l).unwrap();

        let by_email = db.find_lead_by_email_or_phone(Some("bob@x.com"), None).unwrap();
        assert_eq!(by_email.unwrap().id, l.id);

        let by_phone = db
            .find_lead_by_email_or_phone(Some("other@x.com"), Some("5551234567"))
            .unwrap();
        assert_eq!(by_phone.unwrap().id, l.id);

        assert!(db
            .find_lead_by_email_or_phone(Some("nobody@x.com"), None)
            .unwrap()
            .is_none());
        assert!(db.find_lead_by_email_or_phone(None, None).unwrap().is_none());
    }

    #[test]
    fn test_absent_phone_never_matches() {
        let db = Database::open_memory().unwrap();
        db.insert_lead(&lead("NoPhone", Some("a@x.com"), None)).unwrap();

        let found = db
            .find_lead_by_email_or_phone(Some("b@x.com"), None)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_intake_unique_index_rejects_duplicate_email() {
        let db = Database::open_memory().unwrap();
        db.insert_lead(&lead("Bob", Some("bob@x.com"), None)).unwrap();

        let err = db
            .insert_lead(&lead("Bob again", Some("bob@x.com"), None))
            .unwrap_err();
        assert!(matches!(err, CrmError::UniqueViolation(_)));
    }

    #[test]
    fn test_manual_leads_exempt_from_unique_index() {
        let db = Database::open_memory().unwrap();
        let actor = Some(Uuid::new_v4());

        let mut first = lead("Bob", Some("bob@x.com"), None);
        first.created_by = actor;
        let mut second = lead("Bob twin", Some("bob@x.com"), None);
        second.created_by = actor;

        db.insert_lead(&first).unwrap();
        db.insert_lead(&second).unwrap();
        assert_eq!(db.count_leads().unwrap(), 2);
    }

    #[test]
    fn test_list_by_status_and_counts() {
        let db = Database::open_memory().unwrap();
        let a = lead("A", Some("a@x.com"), None);
        let b = lead("B", Some("b@x.com"), None);
        db.insert_lead(&a).unwrap();
        db.insert_lead(&b).unwrap();
        db.update_lead_status(b.id, LeadStatus::Converted).unwrap();

        assert_eq!(db.list_leads_by_status(LeadStatus::New).unwrap().len(), 1);
        let counts = db.count_leads_by_status().unwrap();
        assert_eq!(counts.len(), LeadStatus::ALL.len());
        assert!(counts.contains(&(LeadStatus::Converted, 1)));
        assert!(counts.contains(&(LeadStatus::Closed, 0)));

        let stats = db.lead_stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.new_leads, 1);
        assert_eq!(stats.converted, 1);
        assert_eq!(stats.conversion_rate, "50.0");
    }

    #[test]
    fn test_stats_empty() {
        let db = Database::open_memory().unwrap();
        let stats = db.lead_stats().unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.conversion_rate, "0");
    }

    #[test]
    fn test_list_leads_search() {
        let db = Database::open_memory().unwrap();
        db.insert_lead(&lead("Carol King", Some("carol@x.com"), None)).unwrap();
        db.insert_lead(&lead("Dan", Some("dan@corp.com"), None)).unwrap();

        assert_eq!(db.list_leads(None, 50, 0).unwrap().len(), 2);
        assert_eq!(db.list_leads(Some("KING"), 50, 0).unwrap().len(), 1);
        assert_eq!(db.list_leads(Some("corp"), 50, 0).unwrap()[0].name, "Dan");
        assert_eq!(db.list_leads(Some("  "), 50, 0).unwrap().len(), 2);
    }

    #[test]
    fn test_update_missing_lead_returns_false() {
        let db = Database::open_memory().unwrap();
        assert!(!db
            .update_lead_status(Uuid::new_v4(), LeadStatus::Closed)
            .unwrap());
        assert!(!db.update_lead_notes(Uuid::new_v4(), Some("x")).unwrap());
    }

    #[test]
    fn test_cursor_compare_and_swap() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.assignment_cursor().unwrap(), -1);

        assert!(db.compare_and_swap_cursor(-1, 0).unwrap());
        assert_eq!(db.assignment_cursor().unwrap(), 0);

        // Stale expectation loses
        assert!(!db.compare_and_swap_cursor(-1, 0).unwrap());
        assert_eq!(db.assignment_cursor().unwrap(), 0);
    }

    #[test]
    fn test_find_by_id_prefix() {
        let db = Database::open_memory().unwrap();
        let l = lead("Bob", Some("bob@x.com"), None);
        db.insert_lead(&l).unwrap();
        let prefix = &l.id.to_string()[..8];
        let found = db.find_leads_by_id_prefix(prefix).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, l.id);
    }
}
