use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use super::{check_status, http_client, AdPlatform};
use crate::config::LeadConfig;
use crate::error::{CrmError, CrmResult};
use crate::models::LeadSource;
use crate::pipeline::RawLead;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0/";

/// Facebook Lead Ads, polled through the Graph API.
pub struct FacebookLeadAds {
    client: Client,
    app_id: String,
    access_token: String,
}

impl FacebookLeadAds {
    pub fn from_config(config: &LeadConfig) -> CrmResult<Self> {
        let creds = config.facebook()?;
        Ok(Self {
            client: http_client(config.http_timeout)?,
            app_id: creds.app_id.clone(),
            access_token: creds.access_token.clone(),
        })
    }

    fn forms_url(&self) -> CrmResult<Url> {
        let mut url = Url::parse(GRAPH_API_BASE)
            .and_then(|base| base.join(&format!("{}/leadgen_forms", self.app_id)))
            .map_err(|e| CrmError::Config(format!("invalid Facebook app id: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token);
        Ok(url)
    }
}

impl AdPlatform for FacebookLeadAds {
    fn source(&self) -> LeadSource {
        LeadSource::Facebook
    }

    fn fetch_leads(&self) -> CrmResult<Vec<RawLead>> {
        let response = self.client.get(self.forms_url()?).send()?;
        let response = check_status("Facebook Graph API", response)?;
        let body = response.text()?;
        parse_leads(&body)
    }
}

#[derive(Debug, Deserialize)]
struct LeadgenResponse {
    #[serde(default)]
    data: Vec<LeadgenEntry>,
}

#[derive(Debug, Deserialize)]
struct LeadgenEntry {
    #[serde(default)]
    field_data: Vec<FieldData>,
    campaign_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldData {
    name: String,
    #[serde(default)]
    values: Vec<String>,
}

impl LeadgenEntry {
    fn field(&self, name: &str) -> Option<String> {
        self.field_data
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.values.first().cloned())
    }
}

/// Parse a `leadgen_forms` response body.
pub(crate) fn parse_leads(body: &str) -> CrmResult<Vec<RawLead>> {
    let parsed: LeadgenResponse = serde_json::from_str(body)
        .map_err(|e| CrmError::Upstream(format!("unexpected Facebook response: {}", e)))?;

    Ok(parsed
        .data
        .into_iter()
        .map(|entry| RawLead {
            name: entry.field("full_name").unwrap_or_default(),
            email: entry.field("email"),
            phone: entry.field("phone_number"),
            campaign: entry.campaign_name.clone(),
        })
        .collect())
}
