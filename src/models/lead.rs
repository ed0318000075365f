use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CrmError;

/// Stage names used by an older variant of the pipeline. They are rejected
/// rather than mapped onto the canonical stages.
pub const LEGACY_STATUSES: [&str; 4] = ["qualified", "proposal", "negotiation", "lost"];

/// Pipeline stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    FollowUp,
    Interested,
    Converted,
    Closed,
}

impl LeadStatus {
    /// Board order, left to right.
    pub const ALL: [LeadStatus; 6] = [
        Self::New,
        Self::Contacted,
        Self::FollowUp,
        Self::Interested,
        Self::Converted,
        Self::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::FollowUp => "follow_up",
            Self::Interested => "interested",
            Self::Converted => "converted",
            Self::Closed => "closed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::FollowUp => "Follow-up",
            Self::Interested => "Interested",
            Self::Converted => "Converted",
            Self::Closed => "Closed",
        }
    }

    /// Strict parse. Unknown and legacy stage names are `InvalidStatus`.
    pub fn parse(s: &str) -> Result<Self, CrmError> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "follow_up" | "followup" => Ok(Self::FollowUp),
            "interested" => Ok(Self::Interested),
            "converted" => Ok(Self::Converted),
            "closed" => Ok(Self::Closed),
            legacy if LEGACY_STATUSES.contains(&legacy) => Err(CrmError::InvalidStatus(format!(
                "'{}' is a legacy stage; use one of {}",
                s,
                Self::names()
            ))),
            _ => Err(CrmError::InvalidStatus(format!(
                "'{}' is not one of {}",
                s,
                Self::names()
            ))),
        }
    }

    fn names() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Where a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Facebook,
    Google,
    #[default]
    Manual,
    Referral,
    Other,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
            Self::Manual => "manual",
            Self::Referral => "referral",
            Self::Other => "other",
        }
    }

    /// Name shown to agents in notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Facebook => "Facebook Ads",
            Self::Google => "Google Ads",
            Self::Manual => "Manual",
            Self::Referral => "Referral",
            Self::Other => "Other",
        }
    }

    /// Lenient parse; accepts the ad platforms' display tags too.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "facebook" | "facebook ads" | "fb" => Self::Facebook,
            "google" | "google ads" => Self::Google,
            "manual" => Self::Manual,
            "referral" => Self::Referral,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prospective customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    /// Normalized with [`normalize_email`].
    pub email: Option<String>,
    /// Normalized with [`normalize_phone`].
    pub phone: Option<String>,
    pub source: LeadSource,
    pub campaign: Option<String>,
    pub status: LeadStatus,
    pub assigned_to: Option<Uuid>,
    pub destination: Option<String>,
    pub guests: Option<u32>,
    pub notes: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    /// None for leads created by automated intake.
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(name: String, source: LeadSource) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email: None,
            phone: None,
            source,
            campaign: None,
            status: LeadStatus::New,
            assigned_to: None,
            destination: None,
            guests: None,
            notes: None,
            check_in_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_automated(&self) -> bool {
        self.created_by.is_none()
    }

    /// First available contact route, for display.
    pub fn contact_line(&self) -> String {
        match (&self.email, &self.phone) {
            (Some(e), Some(p)) => format!("{} / {}", e, p),
            (Some(e), None) => e.clone(),
            (None, Some(p)) => p.clone(),
            (None, None) => "-".to_string(),
        }
    }
}

/// Trim and lower-case an email. Blank input is no email at all.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

/// Strip formatting from a phone number, keeping a leading `+`.
/// Blank input is no phone at all, so it never matches another blank phone.
pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            out.push(c);
        } else if c.is_whitespace() || matches!(c, '-' | '.' | '(' | ')') {
            continue;
        } else {
            out.push(c);
        }
    }
    if out.is_empty() || out == "+" {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_canonical() {
        for status in LeadStatus::ALL {
            assert_eq!(LeadStatus::parse(status.as_str()).unwrap(), status);
        }
        assert_eq!(LeadStatus::parse("Follow-up").unwrap(), LeadStatus::FollowUp);
        assert_eq!(LeadStatus::parse(" CLOSED ").unwrap(), LeadStatus::Closed);
    }

    #[test]
    fn test_status_parse_rejects_legacy_and_unknown() {
        let err = LeadStatus::parse("qualified").unwrap_err();
        assert!(matches!(err, CrmError::InvalidStatus(ref m) if m.contains("legacy")));
        assert!(matches!(
            LeadStatus::parse("archived"),
            Err(CrmError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(LeadStatus::FollowUp.label(), "Follow-up");
        assert_eq!(LeadStatus::New.to_string(), "new");
        let json = serde_json::to_string(&LeadStatus::FollowUp).unwrap();
        assert_eq!(json, r#""follow_up""#);
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(LeadSource::parse("Facebook Ads"), LeadSource::Facebook);
        assert_eq!(LeadSource::parse("google"), LeadSource::Google);
        assert_eq!(LeadSource::parse("referral"), LeadSource::Referral);
        assert_eq!(LeadSource::parse("billboard"), LeadSource::Other);
        assert_eq!(LeadSource::Google.display_name(), "Google Ads");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email(Some("  Bob@X.com ")),
            Some("bob@x.com".to_string())
        );
        assert_eq!(normalize_email(Some("   ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(
            normalize_phone(Some("+1 (555) 123-4567")),
            Some("+15551234567".to_string())
        );
        assert_eq!(normalize_phone(Some("555.123.4567")), Some("5551234567".to_string()));
        assert_eq!(normalize_phone(Some("")), None);
        assert_eq!(normalize_phone(Some(" - ")), None);
        assert_eq!(normalize_phone(None), None);
    }

    #[test]
    fn test_new_lead_defaults() {
        let lead = Lead::new("Bob".to_string(), LeadSource::Facebook);
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.assigned_to.is_none());
        assert!(lead.is_automated());
        assert_eq!(lead.contact_line(), "-");
    }
}
