use std::path::PathBuf;

/// User-Agent sent with sample downloads unless the config overrides it.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 7.1; Trident/5.0)";

/// Identifies this client to feed providers and submission services.
pub const CLIENT_USER_AGENT: &str = "Maltrieve";

pub const FEED_TIMEOUT_SECONDS: u64 = 60;

/// In-flight sample requests per wave. Sized to stay well under the raised
/// open-file limit.
pub const WAVE_SIZE: usize = 32;

pub const OPEN_FILE_LIMIT: u64 = 2048;

/// A downloaded and classified sample. Lives only until routing completes.
#[derive(Debug, Clone)]
pub struct Sample {
    pub source_url: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub content_hash: String,
}

impl Sample {
    pub fn host(&self) -> Option<String> {
        crate::utils::url::extract_host(&self.source_url)
    }
}

/// Body of a successful sample GET, before classification.
#[derive(Debug, Clone)]
pub struct Download {
    /// The candidate URL that was requested
    pub url: String,
    /// Where the transport ended up after redirects
    pub final_url: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    StoredExternally { service: String },
    StoredLocally { path: PathBuf },
    Filtered { reason: String },
    Failed { reason: String },
}

impl RoutingOutcome {
    /// Only stored samples mark their source URL as seen.
    pub fn is_stored(&self) -> bool {
        matches!(
            self,
            RoutingOutcome::StoredExternally { .. } | RoutingOutcome::StoredLocally { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub feed_user_agent: String,
    pub feed_timeout_seconds: u64,
    pub wave_size: usize,
    pub proxy: Option<String>,
    pub log_headers: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feed_user_agent: CLIENT_USER_AGENT.to_string(),
            feed_timeout_seconds: FEED_TIMEOUT_SECONDS,
            wave_size: WAVE_SIZE,
            proxy: None,
            log_headers: false,
        }
    }
}

/// Counters for one harvesting run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds_requested: usize,
    pub feeds_fetched: usize,
    pub candidates: usize,
    pub already_seen: usize,
    pub downloaded: usize,
    pub stored_externally: usize,
    pub stored_locally: usize,
    pub filtered: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &RoutingOutcome) {
        match outcome {
            RoutingOutcome::StoredExternally { .. } => self.stored_externally += 1,
            RoutingOutcome::StoredLocally { .. } => self.stored_locally += 1,
            RoutingOutcome::Filtered { .. } => self.filtered += 1,
            RoutingOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn stored(&self) -> usize {
        self.stored_externally + self.stored_locally
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MaltrieveError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Legacy state error: {0}")]
    Legacy(String),

    #[error("{service} rejected submission: {reason}")]
    Submission { service: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MaltrieveError>;
