//! Request and response bodies for the intake gateway.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::LeadStatus;
use crate::pipeline::RawLead;

/// Standard API response wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> GatewayApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub lead_count: u32,
    pub version: String,
}

/// Body of `POST /intake/<source>`.
#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub leads: Vec<RawLead>,
}

/// Body of `POST /leads/<id>/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub actor: Option<Uuid>,
}

/// Body of `POST /leads/<id>/assign`.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub agent_id: Uuid,
    #[serde(default)]
    pub actor: Option<Uuid>,
}

/// One column of the pipeline board.
#[derive(Debug, Serialize, Deserialize)]
pub struct StageCount {
    pub status: LeadStatus,
    pub label: String,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_omits_data() {
        let response: GatewayApiResponse<()> = GatewayApiResponse::err("nope");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"nope"}"#);
    }

    #[test]
    fn test_intake_request_accepts_partial_items() {
        let req: IntakeRequest = serde_json::from_str(
            r#"{"leads": [{"name": "Bob", "email": "bob@x.com"}, {"name": "A"}]}"#,
        )
        .unwrap();
        assert_eq!(req.leads.len(), 2);
        assert_eq!(req.leads[1].email, None);
    }

    #[test]
    fn test_status_request_actor_optional() {
        let req: StatusRequest = serde_json::from_str(r#"{"status": "contacted"}"#).unwrap();
        assert_eq!(req.status, "contacted");
        assert!(req.actor.is_none());
    }
}
