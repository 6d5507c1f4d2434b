use super::{check_status, endpoint, sample_part, sample_tags, MessageResponse};
use crate::traits::{SubmissionReceipt, Submitter};
use crate::types::{Result, Sample};
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;

pub struct ViperSubmitter {
    client: Client,
    base_url: String,
}

impl ViperSubmitter {
    pub const NAME: &'static str = "Viper";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Submitter for ViperSubmitter {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn submit(&self, sample: &Sample) -> Result<SubmissionReceipt> {
        let form = sample_part(sample, "file", Form::new().text("tags", sample_tags(sample)));
        let response = self
            .client
            .post(endpoint(&self.base_url, "file/add"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(Self::NAME, response)?;
        Ok(SubmissionReceipt::new(Self::NAME, MessageResponse::read(response).await))
    }
}
