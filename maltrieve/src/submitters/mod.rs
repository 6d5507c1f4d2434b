//! Clients for the external analysis services.
//!
//! Each one is a single best-effort request/response exchange; nothing is
//! retried. Submissions never go through the harvesting proxy.

pub mod crits;
pub mod cuckoo;
pub mod viper;
pub mod vxcage;

pub use crits::CritsSubmitter;
pub use cuckoo::CuckooSubmitter;
pub use viper::ViperSubmitter;
pub use vxcage::VxCageSubmitter;

use crate::config::ServicesConfig;
use crate::traits::Submitter;
use crate::types::{MaltrieveError, Result, Sample, CLIENT_USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;

/// Enabled services in priority order: VxCage, Cuckoo, Viper, CRITs.
pub fn build_submitters(services: &ServicesConfig) -> Result<Vec<Box<dyn Submitter>>> {
    let client = submission_client(true)?;
    let mut submitters: Vec<Box<dyn Submitter>> = Vec::new();

    if let Some(url) = &services.vxcage {
        submitters.push(Box::new(VxCageSubmitter::new(client.clone(), url)));
    }
    if let Some(url) = &services.cuckoo {
        submitters.push(Box::new(CuckooSubmitter::new(client.clone(), url)));
    }
    if let Some(url) = &services.viper {
        submitters.push(Box::new(ViperSubmitter::new(client.clone(), url)));
    }
    if let Some(crits) = &services.crits {
        let client = if crits.verify_tls {
            client.clone()
        } else {
            submission_client(false)?
        };
        submitters.push(Box::new(CritsSubmitter::new(client, crits.clone())));
    }

    Ok(submitters)
}

pub fn submission_client(verify_tls: bool) -> Result<Client> {
    let client = Client::builder()
        .user_agent(CLIENT_USER_AGENT)
        .no_proxy()
        .danger_accept_invalid_certs(!verify_tls)
        .build()?;
    Ok(client)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// `<host>,Maltrieve`, the tag string the sample stores expect.
pub(crate) fn sample_tags(sample: &Sample) -> String {
    format!("{},{}", sample.host().unwrap_or_default(), CLIENT_USER_AGENT)
}

pub(crate) fn sample_part(sample: &Sample, field_name: &str, form: Form) -> Form {
    let part = Part::bytes(sample.bytes.clone()).file_name(sample.content_hash.clone());
    form.part(field_name.to_string(), part)
}

/// Map a non-success status to a submission error for `service`.
pub(crate) fn check_status(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(MaltrieveError::Submission {
            service: service.to_string(),
            reason: format!("HTTP {}", status),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

impl MessageResponse {
    pub async fn read(response: Response) -> Option<String> {
        response
            .json::<MessageResponse>()
            .await
            .ok()
            .and_then(|r| r.message)
            .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
    }
}
