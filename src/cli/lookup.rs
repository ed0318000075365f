//! Resolve short identifiers typed on the command line.

use anyhow::{anyhow, bail, Result};
use uuid::Uuid;

use crate::db::Database;
use crate::models::{Agent, Lead};

/// Find a lead by full id or id prefix.
pub fn resolve_lead(db: &Database, identifier: &str) -> Result<Lead> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        bail!("Lead identifier cannot be empty.");
    }

    if let Ok(id) = Uuid::parse_str(identifier) {
        return db
            .get_lead(id)?
            .ok_or_else(|| anyhow!("No lead found with ID: {}", identifier));
    }

    let mut matches = db.find_leads_by_id_prefix(identifier)?;
    match matches.len() {
        0 => Err(anyhow!("No lead found matching '{}'", identifier)),
        1 => Ok(matches.remove(0)),
        _ => {
            let mut msg = format!("Multiple leads match '{}'. Be more specific:\n", identifier);
            for lead in &matches {
                msg.push_str(&format!("  {} | {}\n", short(&lead.id), lead.name));
            }
            Err(anyhow!("{}", msg.trim_end()))
        }
    }
}

/// Find an agent by id, id prefix or name.
pub fn resolve_agent(db: &Database, identifier: &str) -> Result<Agent> {
    let mut matches = db.find_agents(identifier)?;
    match matches.len() {
        0 => Err(anyhow!("No agent found matching '{}'", identifier)),
        1 => Ok(matches.remove(0)),
        _ => {
            let mut msg = format!("Multiple agents match '{}'. Be more specific:\n", identifier);
            for agent in &matches {
                msg.push_str(&format!("  {} | {}\n", short(&agent.id), agent.name));
            }
            Err(anyhow!("{}", msg.trim_end()))
        }
    }
}

/// The `--as` agent, if one was given.
pub fn resolve_actor(db: &Database, actor: Option<&str>) -> Result<Option<Uuid>> {
    actor
        .map(|a| resolve_agent(db, a).map(|agent| agent.id))
        .transpose()
}

/// Like [`resolve_actor`], for commands that must know who is acting.
pub fn require_actor(db: &Database, actor: Option<&str>, command: &str) -> Result<Uuid> {
    resolve_actor(db, actor)?
        .ok_or_else(|| anyhow!("'{}' needs to know who is acting; pass --as <agent>", command))
}

/// First eight characters of an id.
pub fn short(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}
