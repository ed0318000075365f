use rusqlite::{params, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid, Database};
use crate::error::CrmResult;
use crate::models::{Agent, AgentRole};

impl Database {
    pub fn insert_agent(&self, agent: &Agent) -> CrmResult<()> {
        self.conn.execute(
            "INSERT INTO agents (id, name, email, role, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                agent.id.to_string(),
                agent.name,
                agent.email,
                agent.role.as_str(),
                format_datetime(&agent.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_agent(&self, id: Uuid) -> CrmResult<Option<Agent>> {
        let result = self.conn.query_row(
            "SELECT id, name, email, role, created_at FROM agents WHERE id = ?",
            [id.to_string()],
            row_to_agent,
        );
        match result {
            Ok(agent) => Ok(Some(agent)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Everyone in the directory, any role.
    pub fn list_agents(&self) -> CrmResult<Vec<Agent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, created_at FROM agents ORDER BY created_at ASC, id ASC",
        )?;
        let agents = stmt
            .query_map([], row_to_agent)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(agents)
    }

    /// Agents eligible for assignment, in stable round-robin order.
    pub fn list_eligible_agents(&self) -> CrmResult<Vec<Agent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, created_at FROM agents
             WHERE role = ? ORDER BY created_at ASC, id ASC",
        )?;
        let agents = stmt
            .query_map([AgentRole::Agent.as_str()], row_to_agent)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(agents)
    }

    /// Resolve an agent by full id, id prefix, or exact name (case-insensitive).
    pub fn find_agents(&self, identifier: &str) -> CrmResult<Vec<Agent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, created_at FROM agents
             WHERE id LIKE ?1 || '%' OR lower(name) = lower(?1)
             ORDER BY created_at ASC, id ASC",
        )?;
        let agents = stmt
            .query_map([identifier.trim()], row_to_agent)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(agents)
    }

    pub fn delete_agent(&self, id: Uuid) -> CrmResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM agents WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }
}

fn row_to_agent(row: &Row) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: AgentRole::parse(&row.get::<_, String>(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}
