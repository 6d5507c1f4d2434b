use super::{check_status, endpoint};
use crate::traits::{SubmissionReceipt, Submitter};
use crate::types::{Result, Sample};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Cuckoo receives the source URL and fetches the sample itself.
pub struct CuckooSubmitter {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    task_id: Option<serde_json::Value>,
}

impl CuckooSubmitter {
    pub const NAME: &'static str = "Cuckoo";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Submitter for CuckooSubmitter {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn submit(&self, sample: &Sample) -> Result<SubmissionReceipt> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "tasks/create/url"))
            .form(&[("url", sample.source_url.as_str())])
            .send()
            .await?;
        let response = check_status(Self::NAME, response)?;

        let task = response
            .json::<TaskResponse>()
            .await
            .ok()
            .and_then(|t| t.task_id)
            .map(|id| format!("task ID {}", id));
        Ok(SubmissionReceipt::new(Self::NAME, task))
    }
}
