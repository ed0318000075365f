use tracing::info;
use uuid::Uuid;

use super::Pipeline;
use crate::error::{CrmError, CrmResult};
use crate::models::Agent;

impl Pipeline<'_> {
    /// Remove an agent from the directory.
    ///
    /// Refused while the agent still owns leads: ownership only changes
    /// through `reassign`, which records the change.
    pub fn remove_agent(&self, agent_id: Uuid) -> CrmResult<Agent> {
        let agent = self.db.write_transaction(|db| {
            let agent = db
                .get_agent(agent_id)?
                .ok_or(CrmError::AgentNotEligible(agent_id))?;

            let count = db.count_leads_assigned_to(agent_id)?;
            if count > 0 {
                return Err(CrmError::AgentOwnsLeads {
                    agent: agent_id,
                    count,
                });
            }

            db.delete_agent(agent_id)?;
            Ok(agent)
        })?;

        info!(agent = %agent_id, "agent removed");
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Lead, LeadSource};
    use crate::pipeline::testing::seed_agents;

    fn owned_lead(db: &Database, email: &str, owner: Uuid) -> Lead {
        let mut lead = Lead::new("Bob".to_string(), LeadSource::Facebook);
        lead.email = Some(email.to_string());
        lead.assigned_to = Some(owner);
        db.insert_lead(&lead).unwrap();
        lead
    }

    #[test]
    fn test_remove_agent_refused_while_owning_leads() {
        let db = Database::open_memory().unwrap();
        let agents = seed_agents(&db, &["A1", "A2"]);
        let lead = owned_lead(&db, "bob@x.com", agents[0].id);
        owned_lead(&db, "carol@x.com", agents[0].id);

        let err = Pipeline::new(&db).remove_agent(agents[0].id).unwrap_err();
        assert!(matches!(err, CrmError::AgentOwnsLeads { count: 2, .. }));
        assert!(err.is_validation());
        assert!(err.to_string().contains("2 lead(s)"));

        assert!(db.get_agent(agents[0].id).unwrap().is_some());
        let stored = db.get_lead(lead.id).unwrap().unwrap();
        assert_eq!(stored.assigned_to, Some(agents[0].id));
        assert!(db.list_activities(lead.id).unwrap().is_empty());
    }

    #[test]
    fn test_remove_agent_after_reassigning_leads() {
        let db = Database::open_memory().unwrap();
        let agents = seed_agents(&db, &["A1", "A2"]);
        let lead = owned_lead(&db, "bob@x.com", agents[0].id);
        let pipeline = Pipeline::new(&db);

        pipeline.reassign(lead.id, agents[1].id, None).unwrap();
        let removed = pipeline.remove_agent(agents[0].id).unwrap();

        assert_eq!(removed.name, "A1");
        assert!(db.get_agent(agents[0].id).unwrap().is_none());
        assert_eq!(db.list_activities(lead.id).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_unknown_agent() {
        let db = Database::open_memory().unwrap();
        let missing = Uuid::new_v4();
        assert!(matches!(
            Pipeline::new(&db).remove_agent(missing),
            Err(CrmError::AgentNotEligible(id)) if id == missing
        ));
    }

    #[test]
    fn test_store_rejects_deleting_an_owner() {
        let db = Database::open_memory().unwrap();
        let agents = seed_agents(&db, &["A1"]);
        let lead = owned_lead(&db, "bob@x.com", agents[0].id);

        assert!(db.delete_agent(agents[0].id).is_err());
        let stored = db.get_lead(lead.id).unwrap().unwrap();
        assert_eq!(stored.assigned_to, Some(agents[0].id));
    }
}
