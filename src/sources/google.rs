use reqwest::blocking::Client;
use serde::Deserialize;

use super::{check_status, http_client, AdPlatform};
use crate::config::LeadConfig;
use crate::error::{CrmError, CrmResult};
use crate::models::LeadSource;
use crate::pipeline::RawLead;

const GOOGLE_ADS_API_BASE: &str = "https://googleads.googleapis.com/v14/customers";

/// Google Ads lead form submissions.
///
/// The access token comes from configuration; refreshing it is left to
/// whoever provisions the credentials.
pub struct GoogleAdsLeadForms {
    client: Client,
    customer_id: String,
    access_token: String,
    developer_token: String,
}

impl GoogleAdsLeadForms {
    pub fn from_config(config: &LeadConfig) -> CrmResult<Self> {
        let creds = config.google_ads()?;
        Ok(Self {
            client: http_client(config.http_timeout)?,
            // Customer ids are often written with dashes in the Ads UI.
            customer_id: creds.customer_id.replace('-', ""),
            access_token: creds.access_token.clone(),
            developer_token: creds.developer_token.clone(),
        })
    }

    fn submissions_url(&self) -> String {
        format!(
            "{}/{}/leadFormSubmissionData",
            GOOGLE_ADS_API_BASE, self.customer_id
        )
    }
}

impl AdPlatform for GoogleAdsLeadForms {
    fn source(&self) -> LeadSource {
        LeadSource::Google
    }

    fn fetch_leads(&self) -> CrmResult<Vec<RawLead>> {
        let response = self
            .client
            .get(self.submissions_url())
            .bearer_auth(&self.access_token)
            .header("developer-token", &self.developer_token)
            .send()?;
        let response = check_status("Google Ads API", response)?;
        let body = response.text()?;
        parse_leads(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SubmissionsResponse {
    #[serde(default)]
    results: Vec<SubmissionRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionRow {
    #[serde(default)]
    lead_form_submission_data: Option<SubmissionData>,
    #[serde(default)]
    campaign: Option<Campaign>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionData {
    full_name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Campaign {
    name: Option<String>,
}

pub(crate) fn parse_leads(body: &str) -> CrmResult<Vec<RawLead>> {
    let parsed: SubmissionsResponse = serde_json::from_str(body)
        .map_err(|e| CrmError::Upstream(format!("unexpected Google Ads response: {}", e)))?;

    Ok(parsed
        .results
        .into_iter()
        .map(|row| {
            let data = row.lead_form_submission_data;
            RawLead {
                name: data
                    .as_ref()
                    .and_then(|d| d.full_name.clone())
                    .unwrap_or_default(),
                email: data.as_ref().and_then(|d| d.email.clone()),
                phone: data.as_ref().and_then(|d| d.phone_number.clone()),
                campaign: row.campaign.and_then(|c| c.name),
            }
        })
        .collect())
}
