use crate::types::{Result, Sample};
use async_trait::async_trait;

/// An external analysis service that can take custody of a sample.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Short service name used in logs and routing outcomes
    fn name(&self) -> &str;

    /// Submit one sample. `Ok` means the service accepted it and no local copy
    /// is needed; any error leaves the decision to the next service in line.
    async fn submit(&self, sample: &Sample) -> Result<SubmissionReceipt>;
}

/// Acknowledgement returned by a service that accepted a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub service: String,
    pub detail: Option<String>,
}

impl SubmissionReceipt {
    pub fn new(service: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            service: service.into(),
            detail,
        }
    }
}
