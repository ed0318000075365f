use tracing::info;
use uuid::Uuid;

use super::{paired_failure, Pipeline};
use crate::error::{CrmError, CrmResult};
use crate::models::{Activity, Agent, Lead, Notification};

impl Pipeline<'_> {
    /// Hand a lead to another agent: update the owner, log an `assignment`
    /// activity and notify the new owner, all in one transaction.
    pub fn reassign(&self, lead_id: Uuid, agent_id: Uuid, actor: Option<Uuid>) -> CrmResult<Lead> {
        let (lead, notification) = self.db.write_transaction(|db| {
            let agent = db
                .get_agent(agent_id)?
                .filter(Agent::is_eligible)
                .ok_or(CrmError::AgentNotEligible(agent_id))?;

            if !db.update_lead_assignee(lead_id, Some(agent.id))? {
                return Err(CrmError::LeadNotFound(lead_id));
            }
            db.append_activity(&Activity::assignment(lead_id, actor, &agent.name))
                .map_err(|e| paired_failure(lead_id, "reassignment", e))?;

            let notification = Notification::lead_reassigned(agent.id, lead_id);
            db.insert_notification(&notification)
                .map_err(|e| paired_failure(lead_id, "reassignment notification", e))?;

            let lead = db.get_lead(lead_id)?.ok_or(CrmError::LeadNotFound(lead_id))?;
            Ok((lead, notification))
        })?;

        info!(lead = %lead_id, agent = %agent_id, "lead reassigned");
        self.relay(&[notification]);
        Ok(lead)
    }
}
