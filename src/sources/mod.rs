//! Ad-platform lead sources.
//!
//! Each platform fetches raw leads over HTTP; parsing is kept separate from
//! the request so it can be exercised without a network.

mod facebook;
mod google;

pub use facebook::FacebookLeadAds;
pub use google::GoogleAdsLeadForms;

use tracing::info;

use crate::config::LeadConfig;
use crate::error::{CrmError, CrmResult};
use crate::models::LeadSource;
use crate::pipeline::{IntakeReport, Pipeline, RawLead};

/// A platform that can be polled for new leads.
pub trait AdPlatform {
    /// Tag recorded on leads from this platform.
    fn source(&self) -> LeadSource;

    /// Fetch the current batch of leads.
    fn fetch_leads(&self) -> CrmResult<Vec<RawLead>>;
}

/// Build the poller for `source` from configuration.
pub fn platform_for(source: LeadSource, config: &LeadConfig) -> CrmResult<Box<dyn AdPlatform>> {
    match source {
        LeadSource::Facebook => Ok(Box::new(FacebookLeadAds::from_config(config)?)),
        LeadSource::Google => Ok(Box::new(GoogleAdsLeadForms::from_config(config)?)),
        other => Err(CrmError::Config(format!(
            "'{}' is not a pollable ad platform (expected facebook or google)",
            other
        ))),
    }
}

/// Fetch from a platform and run the batch through intake.
///
/// A failed fetch is returned to the caller; once fetched, per-lead failures
/// are reported in the batch.
pub fn poll(pipeline: &Pipeline, platform: &dyn AdPlatform) -> CrmResult<IntakeReport> {
    let source = platform.source();
    let raws = platform.fetch_leads()?;
    info!(source = %source, fetched = raws.len(), "polled ad platform");
    Ok(pipeline.ingest_batch(&raws, source))
}

fn http_client(timeout: std::time::Duration) -> CrmResult<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("leadcmd/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Turn a non-2xx response into an `Upstream` error carrying the body.
fn check_status(
    platform: &str,
    response: reqwest::blocking::Response,
) -> CrmResult<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(CrmError::Upstream(format!(
        "{} returned HTTP {}: {}",
        platform,
        status.as_u16(),
        body.chars().take(200).collect::<String>()
    )))
}
