use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Admin,
    Manager,
    #[default]
    Agent,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Agent => "agent",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            "manager" => Self::Manager,
            _ => Self::Agent,
        }
    }
}

/// A user who can own leads. Only `agent` role users receive assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub role: AgentRole,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: None,
            role: AgentRole::Agent,
            created_at: Utc::now(),
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.role == AgentRole::Agent
    }
}
