use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{assignment, Pipeline};
use crate::db::Database;
use crate::error::{CrmError, CrmResult};
use crate::models::{normalize_email, normalize_phone, Lead, LeadSource, Notification};

/// Campaign recorded when the source does not name one.
pub const DEFAULT_CAMPAIGN: &str = "Unknown";

/// Lead payload as delivered by an ad platform or an import file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
}

impl RawLead {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    /// Map into a new, unassigned lead with normalized contact keys.
    pub fn to_lead(&self, source: LeadSource) -> CrmResult<Lead> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CrmError::InvalidPayload("name is required".to_string()));
        }

        let email = normalize_email(self.email.as_deref());
        let phone = normalize_phone(self.phone.as_deref());
        if email.is_none() && phone.is_none() {
            return Err(CrmError::InvalidPayload(format!(
                "lead '{}' has neither email nor phone",
                name
            )));
        }

        let campaign = self
            .campaign
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CAMPAIGN);

        let mut lead = Lead::new(name.to_string(), source);
        lead.email = email;
        lead.phone = phone;
        lead.campaign = Some(campaign.to_string());
        Ok(lead)
    }
}

/// Result of ingesting one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Created {
        lead_id: Uuid,
        assigned_to: Option<Uuid>,
    },
    /// An existing lead already has this email or phone. Nothing was written.
    Duplicate { lead_id: Uuid },
}

impl IntakeOutcome {
    pub fn lead_id(&self) -> Uuid {
        match self {
            Self::Created { lead_id, .. } | Self::Duplicate { lead_id } => *lead_id,
        }
    }
}

/// Per-item entry in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Created {
        lead_id: Uuid,
        assigned_to: Option<Uuid>,
    },
    Duplicate {
        lead_id: Uuid,
    },
    InvalidPayload {
        error: String,
    },
    Failed {
        error: String,
        retryable: bool,
    },
}

impl From<CrmResult<IntakeOutcome>> for ItemOutcome {
    fn from(result: CrmResult<IntakeOutcome>) -> Self {
        match result {
            Ok(IntakeOutcome::Created {
                lead_id,
                assigned_to,
            }) => Self::Created {
                lead_id,
                assigned_to,
            },
            Ok(IntakeOutcome::Duplicate { lead_id }) => Self::Duplicate { lead_id },
            Err(CrmError::InvalidPayload(error)) => Self::InvalidPayload { error },
            Err(e) => Self::Failed {
                retryable: e.is_retryable(),
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeReport {
    pub processed: usize,
    pub created: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub failed: usize,
    pub items: Vec<ItemOutcome>,
}

impl IntakeReport {
    fn record(&mut self, item: ItemOutcome) {
        self.processed += 1;
        match item {
            ItemOutcome::Created { .. } => self.created += 1,
            ItemOutcome::Duplicate { .. } => self.duplicates += 1,
            ItemOutcome::InvalidPayload { .. } => self.invalid += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.items.push(item);
    }
}

impl Pipeline<'_> {
    /// Normalize, deduplicate, assign, persist and notify for one payload.
    pub fn ingest(&self, raw: &RawLead, source: LeadSource) -> CrmResult<IntakeOutcome> {
        let lead = match raw.to_lead(source) {
            Ok(lead) => lead,
            Err(e) => {
                warn!(source = %source, error = %e, "dropping invalid intake payload");
                return Err(e);
            }
        };

        let result = self.db.write_transaction(|db| {
            if let Some(existing) =
                db.find_lead_by_email_or_phone(lead.email.as_deref(), lead.phone.as_deref())?
            {
                return Ok((IntakeOutcome::Duplicate { lead_id: existing.id }, None));
            }
            admit(db, lead.clone())
        });

        let (outcome, notification) = match result {
            Err(CrmError::UniqueViolation(detail)) => (settle_duplicate(self.db, &lead, detail)?, None),
            other => other?,
        };

        match outcome {
            IntakeOutcome::Created {
                lead_id,
                assigned_to,
            } => {
                info!(lead = %lead_id, source = %source, assigned_to = ?assigned_to, "lead created");
            }
            IntakeOutcome::Duplicate { lead_id } => {
                debug!(existing = %lead_id, source = %source, "duplicate lead skipped");
            }
        }

        if let Some(n) = notification {
            self.relay(&[n]);
        }
        Ok(outcome)
    }

    /// Ingest each payload independently. One failure never stops the rest.
    pub fn ingest_batch(&self, raws: &[RawLead], source: LeadSource) -> IntakeReport {
        let mut report = IntakeReport::default();
        for raw in raws {
            report.record(self.ingest(raw, source).into());
        }
        info!(
            source = %source,
            processed = report.processed,
            created = report.created,
            duplicates = report.duplicates,
            invalid = report.invalid,
            failed = report.failed,
            "intake batch finished"
        );
        report
    }
}

/// Assign, insert and notify. Runs inside the caller's write transaction.
fn admit(db: &Database, mut lead: Lead) -> CrmResult<(IntakeOutcome, Option<Notification>)> {
    let agent = match assignment::assign_next(db) {
        Ok(agent) => Some(agent),
        Err(CrmError::NoEligibleAgents) => {
            warn!(lead = %lead.id, "no eligible agents, storing lead unassigned");
            None
        }
        Err(e) => return Err(e),
    };
    lead.assigned_to = agent.as_ref().map(|a| a.id);

    db.insert_lead(&lead)?;

    let notification = match &agent {
        Some(agent) => {
            let n = Notification::lead_assigned(agent.id, lead.id, lead.source, &lead.name);
            db.insert_notification(&n)?;
            Some(n)
        }
        None => None,
    };

    Ok((
        IntakeOutcome::Created {
            lead_id: lead.id,
            assigned_to: lead.assigned_to,
        },
        notification,
    ))
}

/// The unique index caught a duplicate the lookup missed. The insert (and the
/// cursor move) were rolled back; report the lead that won.
fn settle_duplicate(db: &Database, lead: &Lead, detail: String) -> CrmResult<IntakeOutcome> {
    match db.find_lead_by_email_or_phone(lead.email.as_deref(), lead.phone.as_deref())? {
        Some(existing) => Ok(IntakeOutcome::Duplicate {
            lead_id: existing.id,
        }),
        None => Err(CrmError::UniqueViolation(detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{break_notifications, seed_agents};

    fn raw(name: &str, email: &str) -> RawLead {
        RawLead::new(name).with_email(email)
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let db = Database::open_memory().unwrap();
        seed_agents(&db, &["A1"]);
        let pipeline = Pipeline::new(&db);
        let payload = raw("Bob", "bob@x.com");

        let first = pipeline.ingest(&payload, LeadSource::Facebook).unwrap();
        let second = pipeline.ingest(&payload, LeadSource::Facebook).unwrap();

        assert!(matches!(first, IntakeOutcome::Created { .. }));
        assert_eq!(
            second,
            IntakeOutcome::Duplicate {
                lead_id: first.lead_id()
            }
        );
        assert_eq!(db.count_leads().unwrap(), 1);
        assert_eq!(db.count_notifications().unwrap(), 1);
    }

    #[test]
    fn test_round_robin_is_fair() {
        let db = Database::open_memory().unwrap();
        let agents = seed_agents(&db, &["A1", "A2", "A3"]);
        let pipeline = Pipeline::new(&db);

        for i in 0..agents.len() {
            let payload = raw(&format!("Lead {}", i), &format!("lead{}@x.com", i));
            pipeline.ingest(&payload, LeadSource::Google).unwrap();
        }

        for agent in &agents {
            assert_eq!(db.list_leads_assigned_to(agent.id).unwrap().len(), 1);
            assert_eq!(db.list_notifications(agent.id, 10).unwrap().len(), 1);
        }
        // Back at the start: the next pick is the first agent again.
        let last = db.assignment_cursor().unwrap();
        assert_eq!(last, agents.len() as i64 - 1);
        let eligible = db.list_eligible_agents().unwrap();
        let (next, _) = assignment::select_next_agent(&eligible, last).unwrap();
        assert_eq!(next.id, agents[0].id);
    }

    #[test]
    fn test_unassigned_fallback_without_agents() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);

        let outcome = pipeline
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Facebook)
            .unwrap();

        match outcome {
            IntakeOutcome::Created {
                lead_id,
                assigned_to,
            } => {
                assert_eq!(assigned_to, None);
                assert_eq!(db.get_lead(lead_id).unwrap().unwrap().assigned_to, None);
            }
            other => panic!("expected Created, got {:?}", other),
        }
        assert_eq!(db.count_notifications().unwrap(), 0);
        assert_eq!(db.assignment_cursor().unwrap(), -1);
    }

    #[test]
    fn test_invalid_payload_rejected_without_write() {
        let db = Database::open_memory().unwrap();
        seed_agents(&db, &["A1"]);
        let pipeline = Pipeline::new(&db);

        let err = pipeline
            .ingest(&RawLead::new("A"), LeadSource::Facebook)
            .unwrap_err();
        assert!(matches!(err, CrmError::InvalidPayload(_)));

        let err = pipeline
            .ingest(&RawLead::new("   ").with_email("a@x.com"), LeadSource::Facebook)
            .unwrap_err();
        assert!(matches!(err, CrmError::InvalidPayload(_)));

        assert_eq!(db.count_leads().unwrap(), 0);
        assert_eq!(db.assignment_cursor().unwrap(), -1);
    }

    #[test]
    fn test_scenario_two_agents_then_duplicate() {
        let db = Database::open_memory().unwrap();
        let agents = seed_agents(&db, &["A1", "A2"]);
        let pipeline = Pipeline::new(&db);
        assert_eq!(db.assignment_cursor().unwrap(), -1);

        let bob = pipeline
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Facebook)
            .unwrap();
        assert_eq!(
            bob,
            IntakeOutcome::Created {
                lead_id: bob.lead_id(),
                assigned_to: Some(agents[0].id)
            }
        );
        assert_eq!(db.assignment_cursor().unwrap(), 0);

        let carol = pipeline
            .ingest(&raw("Carol", "carol@x.com"), LeadSource::Facebook)
            .unwrap();
        assert_eq!(
            carol,
            IntakeOutcome::Created {
                lead_id: carol.lead_id(),
                assigned_to: Some(agents[1].id)
            }
        );
        assert_eq!(db.assignment_cursor().unwrap(), 1);

        let bob2 = pipeline
            .ingest(&raw("Bob2", "bob@x.com"), LeadSource::Facebook)
            .unwrap();
        assert_eq!(
            bob2,
            IntakeOutcome::Duplicate {
                lead_id: bob.lead_id()
            }
        );
        assert_eq!(db.assignment_cursor().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_by_phone_with_formatting() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);

        let first = pipeline
            .ingest(&RawLead::new("Dan").with_phone("(555) 123-4567"), LeadSource::Google)
            .unwrap();
        let second = pipeline
            .ingest(&RawLead::new("Daniel").with_phone("555.123.4567"), LeadSource::Facebook)
            .unwrap();
        assert_eq!(second, IntakeOutcome::Duplicate { lead_id: first.lead_id() });
    }

    #[test]
    fn test_missing_phone_does_not_match_other_missing_phones() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);

        pipeline
            .ingest(&raw("Bob", "bob@x.com").with_phone(" "), LeadSource::Facebook)
            .unwrap();
        let carol = pipeline
            .ingest(&raw("Carol", "carol@x.com"), LeadSource::Facebook)
            .unwrap();
        assert!(matches!(carol, IntakeOutcome::Created { .. }));
        assert_eq!(db.count_leads().unwrap(), 2);
    }

    #[test]
    fn test_email_match_is_case_insensitive() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        pipeline
            .ingest(&raw("Bob", "Bob@X.com "), LeadSource::Facebook)
            .unwrap();
        let again = pipeline
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Google)
            .unwrap();
        assert!(matches!(again, IntakeOutcome::Duplicate { .. }));
    }

    #[test]
    fn test_campaign_defaults_to_unknown() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        let outcome = pipeline
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Facebook)
            .unwrap();
        let lead = db.get_lead(outcome.lead_id()).unwrap().unwrap();
        assert_eq!(lead.campaign.as_deref(), Some(DEFAULT_CAMPAIGN));
        assert_eq!(lead.source, LeadSource::Facebook);
        assert!(lead.is_automated());
    }

    #[test]
    fn test_manual_lead_blocks_automated_duplicate() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        let mut manual = Lead::new("Bob".to_string(), LeadSource::Manual);
        manual.email = Some("bob@x.com".to_string());
        manual.created_by = Some(Uuid::new_v4());
        db.insert_lead(&manual).unwrap();

        let outcome = pipeline
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Facebook)
            .unwrap();
        assert_eq!(outcome, IntakeOutcome::Duplicate { lead_id: manual.id });
    }

    #[test]
    fn test_unique_index_backstop_rolls_back_and_settles() {
        let db = Database::open_memory().unwrap();
        seed_agents(&db, &["A1", "A2"]);
        let winner = RawLead::new("Bob").with_email("bob@x.com").to_lead(LeadSource::Facebook).unwrap();
        db.insert_lead(&winner).unwrap();

        // Skip the lookup, as a racing writer would have.
        let loser = RawLead::new("Bob").with_email("bob@x.com").to_lead(LeadSource::Google).unwrap();
        let err = db
            .write_transaction(|db| admit(db, loser.clone()))
            .unwrap_err();
        let detail = match err {
            CrmError::UniqueViolation(detail) => detail,
            other => panic!("expected UniqueViolation, got {:?}", other),
        };

        // Cursor move and notification were rolled back with the insert.
        assert_eq!(db.assignment_cursor().unwrap(), -1);
        assert_eq!(db.count_notifications().unwrap(), 0);

        let settled = settle_duplicate(&db, &loser, detail).unwrap();
        assert_eq!(settled, IntakeOutcome::Duplicate { lead_id: winner.id });
    }

    #[test]
    fn test_notification_failure_rolls_back_lead() {
        let db = Database::open_memory().unwrap();
        seed_agents(&db, &["A1"]);
        break_notifications(&db);
        let pipeline = Pipeline::new(&db);

        let result = pipeline.ingest(&raw("Bob", "bob@x.com"), LeadSource::Facebook);
        assert!(result.is_err());
        assert_eq!(db.count_leads().unwrap(), 0);
        assert_eq!(db.assignment_cursor().unwrap(), -1);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let db = Database::open_memory().unwrap();
        seed_agents(&db, &["A1"]);
        let pipeline = Pipeline::new(&db);

        let batch = vec![
            raw("Bob", "bob@x.com"),
            RawLead::new("NoContact"),
            raw("Bob again", "bob@x.com"),
            raw("Carol", "carol@x.com"),
        ];
        let report = pipeline.ingest_batch(&batch, LeadSource::Facebook);

        assert_eq!(report.processed, 4);
        assert_eq!(report.created, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.failed, 0);
        assert!(matches!(report.items[1], ItemOutcome::InvalidPayload { .. }));
        assert!(matches!(report.items[3], ItemOutcome::Created { .. }));
        assert_eq!(db.count_leads().unwrap(), 2);
    }

    #[test]
    fn test_batch_continues_after_storage_failure() {
        let db = Database::open_memory().unwrap();
        seed_agents(&db, &["A1"]);
        let pipeline = Pipeline::new(&db);
        // Poison only inserts of one specific lead.
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_eve BEFORE INSERT ON leads WHEN NEW.email = 'eve@x.com'
                 BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END;",
            )
            .unwrap();

        let batch = vec![raw("Eve", "eve@x.com"), raw("Frank", "frank@x.com")];
        let report = pipeline.ingest_batch(&batch, LeadSource::Google);

        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
        assert!(matches!(report.items[0], ItemOutcome::Failed { .. }));
    }

    #[test]
    fn test_report_serializes_outcome_tags() {
        let item = ItemOutcome::from(Ok(IntakeOutcome::Duplicate {
            lead_id: Uuid::nil(),
        }));
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""outcome":"duplicate""#));

        let item = ItemOutcome::from(Err(CrmError::InvalidPayload("no contact".into())));
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""outcome":"invalid_payload""#));
    }

    #[test]
    fn test_two_connections_share_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.db");
        let db_a = Database::open_at(path.clone()).unwrap();
        let db_b = Database::open_at(path).unwrap();
        let agents = seed_agents(&db_a, &["A1", "A2"]);

        let a = Pipeline::new(&db_a)
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Facebook)
            .unwrap();
        let b = Pipeline::new(&db_b)
            .ingest(&raw("Carol", "carol@x.com"), LeadSource::Facebook)
            .unwrap();
        let dup = Pipeline::new(&db_b)
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Google)
            .unwrap();

        assert!(matches!(a, IntakeOutcome::Created { assigned_to: Some(id), .. } if id == agents[0].id));
        assert!(matches!(b, IntakeOutcome::Created { assigned_to: Some(id), .. } if id == agents[1].id));
        assert_eq!(dup, IntakeOutcome::Duplicate { lead_id: a.lead_id() });
    }

    #[test]
    fn test_lock_timeout_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.db");
        let db_a = Database::open_at(path.clone()).unwrap();
        let db_b = Database::open_at(path).unwrap();
        seed_agents(&db_a, &["A1"]);

        db_a.conn().execute_batch("BEGIN IMMEDIATE").unwrap();
        db_b.set_busy_timeout(std::time::Duration::from_millis(50)).unwrap();

        let err = Pipeline::new(&db_b)
            .ingest(&raw("Bob", "bob@x.com"), LeadSource::Facebook)
            .unwrap_err();
        assert!(matches!(err, CrmError::Timeout(_)));
        assert!(err.is_retryable());

        db_a.conn().execute_batch("ROLLBACK").unwrap();
        assert_eq!(db_b.count_leads().unwrap(), 0);
        assert_eq!(db_b.assignment_cursor().unwrap(), -1);
    }

    #[test]
    fn test_concurrent_intake_stays_fair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.db");
        let setup = Database::open_at(path.clone()).unwrap();
        let agents = seed_agents(&setup, &["A1", "A2"]);

        let handles: Vec<_> = (0..2)
            .map(|worker| {
                let db = Database::open_at(path.clone()).unwrap();
                std::thread::spawn(move || {
                    let pipeline = Pipeline::new(&db);
                    for i in 0..10 {
                        let payload = raw(
                            &format!("Lead {}-{}", worker, i),
                            &format!("w{}-{}@x.com", worker, i),
                        );
                        pipeline.ingest(&payload, LeadSource::Facebook).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(setup.count_leads().unwrap(), 20);
        for agent in &agents {
            assert_eq!(setup.list_leads_assigned_to(agent.id).unwrap().len(), 10);
        }
    }
}
