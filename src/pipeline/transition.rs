use tracing::info;
use uuid::Uuid;

use super::{paired_failure, Pipeline};
use crate::error::{CrmError, CrmResult};
use crate::models::{Activity, Lead, LeadStatus};

impl Pipeline<'_> {
    /// Move a lead to `new_status` and record a `status_change` activity.
    ///
    /// Any stage may follow any other. Unknown and legacy stage names are
    /// rejected before anything is written.
    pub fn transition(&self, lead_id: Uuid, new_status: &str, actor: Option<Uuid>) -> CrmResult<Lead> {
        let status = LeadStatus::parse(new_status)?;
        self.transition_to(lead_id, status, actor)
    }

    pub fn transition_to(
        &self,
        lead_id: Uuid,
        status: LeadStatus,
        actor: Option<Uuid>,
    ) -> CrmResult<Lead> {
        let lead = self.db.write_transaction(|db| {
            if !db.update_lead_status(lead_id, status)? {
                return Err(CrmError::LeadNotFound(lead_id));
            }
            db.append_activity(&Activity::status_change(lead_id, actor, status))
                .map_err(|e| paired_failure(lead_id, "status change", e))?;
            db.get_lead(lead_id)?.ok_or(CrmError::LeadNotFound(lead_id))
        })?;

        info!(lead = %lead_id, status = %status, "lead status changed");
        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{ActivityType, LeadSource};
    use crate::pipeline::testing::break_activity_log;

    fn seeded_lead(db: &Database) -> Lead {
        let mut lead = Lead::new("Bob".to_string(), LeadSource::Facebook);
        lead.email = Some("bob@x.com".to_string());
        db.insert_lead(&lead).unwrap();
        lead
    }

    #[test]
    fn test_every_status_updates_lead_and_logs_once() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        let lead = seeded_lead(&db);
        let actor = Some(Uuid::new_v4());

        for (i, status) in LeadStatus::ALL.iter().enumerate() {
            let updated = pipeline.transition(lead.id, status.as_str(), actor).unwrap();
            assert_eq!(updated.status, *status);
            assert_eq!(db.get_lead(lead.id).unwrap().unwrap().status, *status);
            assert_eq!(
                db.count_activities(lead.id, ActivityType::StatusChange).unwrap(),
                i as u32 + 1
            );
        }

        let latest = &db.list_activities(lead.id).unwrap()[0];
        assert_eq!(latest.description.as_deref(), Some("Status changed to Closed"));
        assert_eq!(latest.user_id, actor);
    }

    #[test]
    fn test_failed_activity_append_leaves_status_unchanged() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        let lead = seeded_lead(&db);
        break_activity_log(&db);

        for status in LeadStatus::ALL {
            let err = pipeline.transition_to(lead.id, status, None).unwrap_err();
            assert!(matches!(err, CrmError::AtomicityViolation(_)), "{:?}", err);
            assert_eq!(db.get_lead(lead.id).unwrap().unwrap().status, LeadStatus::New);
        }
        assert!(db.list_activities(lead.id).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_and_legacy_status_rejected_without_write() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        let lead = seeded_lead(&db);

        for bad in ["won", "qualified", "lost", ""] {
            let err = pipeline.transition(lead.id, bad, None).unwrap_err();
            assert!(matches!(err, CrmError::InvalidStatus(_)));
        }
        assert_eq!(db.get_lead(lead.id).unwrap().unwrap().status, LeadStatus::New);
        assert!(db.list_activities(lead.id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_lead() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        let missing = Uuid::new_v4();
        let err = pipeline.transition(missing, "contacted", None).unwrap_err();
        assert!(matches!(err, CrmError::LeadNotFound(id) if id == missing));
    }

    #[test]
    fn test_replaying_same_status_is_harmless() {
        let db = Database::open_memory().unwrap();
        let pipeline = Pipeline::new(&db);
        let lead = seeded_lead(&db);

        pipeline.transition(lead.id, "interested", None).unwrap();
        let again = pipeline.transition(lead.id, "interested", None).unwrap();
        assert_eq!(again.status, LeadStatus::Interested);
        assert_eq!(
            db.count_activities(lead.id, ActivityType::StatusChange).unwrap(),
            2
        );
    }
}
