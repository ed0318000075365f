use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use tracing::info;
use uuid::Uuid;

use super::Pipeline;
use crate::error::{CrmError, CrmResult};
use crate::models::{normalize_email, normalize_phone, Lead, LeadSource};

/// Loose shape check: something@domain.tld, no whitespace.
fn looks_like_email(email: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
        })
        .is_match(email)
}

/// A lead typed in by a user.
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub source: LeadSource,
    pub campaign: Option<String>,
    pub destination: Option<String>,
    pub guests: Option<u32>,
    pub check_in_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Pipeline<'_> {
    /// Store a manually entered lead.
    ///
    /// Manual entry skips the duplicate check and round-robin assignment; the
    /// lead is recorded as created by `actor`.
    pub fn create_lead(&self, input: NewLead, actor: Uuid) -> CrmResult<Lead> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CrmError::InvalidPayload("name is required".to_string()));
        }
        let email = normalize_email(Some(&input.email))
            .ok_or_else(|| CrmError::InvalidPayload("email is required".to_string()))?;
        if !looks_like_email(&email) {
            return Err(CrmError::InvalidPayload(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        if input.guests == Some(0) {
            return Err(CrmError::InvalidPayload(
                "guests must be at least 1".to_string(),
            ));
        }

        let mut lead = Lead::new(name.to_string(), input.source);
        lead.email = Some(email);
        lead.phone = normalize_phone(input.phone.as_deref());
        lead.campaign = input.campaign.filter(|c| !c.trim().is_empty());
        lead.destination = input.destination.filter(|d| !d.trim().is_empty());
        lead.guests = input.guests;
        lead.check_in_date = input.check_in_date;
        lead.notes = input.notes.filter(|n| !n.trim().is_empty());
        lead.created_by = Some(actor);

        self.db.insert_lead(&lead)?;
        info!(lead = %lead.id, actor = %actor, "manual lead created");
        Ok(lead)
    }
}
