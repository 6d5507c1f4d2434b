use crate::traits::Submitter;
use crate::types::{Result, RoutingOutcome, Sample};
use crate::utils::mime::directory_name;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Hash-keyed sample files under the dump directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dump_dir: PathBuf,
    sort_mime: bool,
}

impl LocalStore {
    pub fn new(dump_dir: impl Into<PathBuf>, sort_mime: bool) -> Self {
        Self {
            dump_dir: dump_dir.into(),
            sort_mime,
        }
    }

    /// `<dump>/<hash>`, or `<dump>/<mime_with_underscores>/<hash>` when sorting.
    pub fn path_for(&self, sample: &Sample) -> PathBuf {
        if self.sort_mime {
            self.dump_dir
                .join(directory_name(&sample.mime_type))
                .join(&sample.content_hash)
        } else {
            self.dump_dir.join(&sample.content_hash)
        }
    }

    pub fn store(&self, sample: &Sample) -> Result<PathBuf> {
        let path = self.path_for(sample);
        if self.sort_mime {
            if let Some(folder) = path.parent() {
                fs::create_dir_all(folder)?;
            }
        }
        fs::write(&path, &sample.bytes)?;
        info!("Saved {} to dump dir", sample.content_hash);
        Ok(path)
    }
}

/// Hands each accepted sample to the first external service that takes it,
/// keeping a local copy only when none does.
pub struct StorageRouter {
    submitters: Vec<Box<dyn Submitter>>,
    local: LocalStore,
}

impl StorageRouter {
    /// `submitters` are tried in the order given.
    pub fn new(submitters: Vec<Box<dyn Submitter>>, local: LocalStore) -> Self {
        Self { submitters, local }
    }

    pub fn submitter_names(&self) -> Vec<&str> {
        self.submitters.iter().map(|s| s.name()).collect()
    }

    pub async fn route(&self, sample: &Sample) -> RoutingOutcome {
        for submitter in &self.submitters {
            match submitter.submit(sample).await {
                Ok(receipt) => {
                    info!(
                        "Submitted {} to {}{}",
                        sample.content_hash,
                        receipt.service,
                        receipt
                            .detail
                            .as_deref()
                            .map(|d| format!(": {}", d))
                            .unwrap_or_default()
                    );
                    return RoutingOutcome::StoredExternally {
                        service: receipt.service,
                    };
                }
                Err(e) => warn!(
                    "{} did not accept {}: {}",
                    submitter.name(),
                    sample.content_hash,
                    e
                ),
            }
        }

        match self.local.store(sample) {
            Ok(path) => RoutingOutcome::StoredLocally { path },
            Err(e) => {
                error!(
                    "Could not write {} from {}: {}",
                    sample.content_hash, sample.source_url, e
                );
                RoutingOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
