use super::{check_status, endpoint, sample_part};
use crate::config::CritsConfig;
use crate::traits::{SubmissionReceipt, Submitter};
use crate::types::{MaltrieveError, Result, Sample};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

const ZIP_TYPES: &[&str] = &["application/zip", "application/gzip", "application/x-7z-compressed"];
const RAR_TYPES: &[&str] = &["application/x-rar", "application/x-rar-compressed"];

/// CRITs takes the sample, the domain it came from, and a
/// `Downloaded_From` relationship between the two.
pub struct CritsSubmitter {
    client: Client,
    config: CritsConfig,
}

/// A record CRITs created, identified by its type and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CritsRecord {
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct CritsResponse {
    #[serde(default)]
    return_code: Option<i64>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<serde_json::Value>,
}

impl CritsResponse {
    fn into_record(self) -> Option<CritsRecord> {
        if self.return_code != Some(0) {
            return None;
        }
        let id = self
            .id
            .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()))?;
        Some(CritsRecord {
            kind: self.kind.unwrap_or_default(),
            id,
        })
    }
}

/// CRITs only understands zip, rar and raw uploads.
pub fn file_format(mime_type: &str) -> &'static str {
    if ZIP_TYPES.contains(&mime_type) {
        "zip"
    } else if RAR_TYPES.contains(&mime_type) {
        "rar"
    } else {
        "raw"
    }
}

impl CritsSubmitter {
    pub const NAME: &'static str = "CRITs";

    pub fn new(client: Client, config: CritsConfig) -> Self {
        Self { client, config }
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.config.api_key.clone()),
            ("username", self.config.username.clone()),
            ("source", self.config.source.clone()),
        ]
    }

    /// Register the sample's host as a domain. Failure only costs the
    /// relationship, never the sample.
    async fn submit_domain(&self, sample: &Sample) -> Option<CritsRecord> {
        let host = sample.host()?;
        let mut fields = self.credentials();
        fields.push(("domain", host));

        let response = self
            .client
            .post(endpoint(&self.config.url, "api/v1/domains/"))
            .form(&fields)
            .send()
            .await;

        let parsed = match response {
            Ok(response) if response.status().is_success() => {
                response.json::<CritsResponse>().await.ok()
            }
            Ok(response) => {
                info!("CRITs refused domain for {}: HTTP {}", sample.content_hash, response.status());
                None
            }
            Err(e) => {
                info!("Could not submit domain for {} to CRITs: {}", sample.content_hash, e);
                None
            }
        }?;

        info!(
            "Submitted domain info for {} to CRITs, response was {}",
            sample.content_hash,
            parsed.message.as_ref().map(|m| m.to_string()).unwrap_or_default()
        );
        parsed.into_record()
    }

    async fn submit_sample(&self, sample: &Sample) -> Result<CritsRecord> {
        let mut form = Form::new();
        for (key, value) in self.credentials() {
            form = form.text(key, value);
        }
        let form = form
            .text("upload_type", "file")
            .text("md5", sample.content_hash.clone())
            .text("file_format", file_format(&sample.mime_type));
        let form = sample_part(sample, "filedata", form);

        let response = self
            .client
            .post(endpoint(&self.config.url, "api/v1/samples/"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(Self::NAME, response)?;

        let parsed: CritsResponse = response.json().await?;
        parsed.into_record().ok_or_else(|| MaltrieveError::Submission {
            service: Self::NAME.to_string(),
            reason: "sample was not inserted".to_string(),
        })
    }

    async fn link(&self, sample: &Sample, sample_record: &CritsRecord, domain_record: &CritsRecord) {
        let mut fields = self.credentials();
        fields.extend([
            ("right_type", domain_record.kind.clone()),
            ("right_id", domain_record.id.clone()),
            ("left_type", sample_record.kind.clone()),
            ("left_id", sample_record.id.clone()),
            ("rel_type", "Downloaded_From".to_string()),
            ("rel_confidence", "high".to_string()),
            ("rel_date", Utc::now().to_rfc3339()),
        ]);

        let result = self
            .client
            .post(endpoint(&self.config.url, "api/v1/relationships/"))
            .form(&fields)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Submitted relationship info for {} to CRITs", sample.content_hash)
            }
            _ => info!("Relationship submission skipped for {}", sample.content_hash),
        }
    }
}

#[async_trait]
impl Submitter for CritsSubmitter {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn submit(&self, sample: &Sample) -> Result<SubmissionReceipt> {
        let domain = self.submit_domain(sample).await;
        let record = self.submit_sample(sample).await?;
        info!("Submitted sample info for {} to CRITs", sample.content_hash);

        match &domain {
            Some(domain) => self.link(sample, &record, domain).await,
            None => info!("Skipping relationship for {}: CRITs did not accept the domain", sample.content_hash),
        }

        Ok(SubmissionReceipt::new(Self::NAME, Some(format!("{} {}", record.kind, record.id))))
    }
}
