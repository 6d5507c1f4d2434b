pub mod types;
pub mod traits;
pub mod config;
pub mod utils;
pub mod parser;
pub mod sources;
pub mod fetcher;
pub mod state;
pub mod classifier;
pub mod storage;
pub mod submitters;
pub mod pipeline;
pub mod limits;

pub use types::*;
pub use traits::{SubmissionReceipt, Submitter};
pub use config::{Cli, Config, FileConfig};
pub use parser::FeedFormat;
pub use sources::{FeedSource, SourceAdapter};
pub use fetcher::Fetcher;
pub use state::{DedupState, DedupStore};
pub use classifier::{Classifier, MimeFilter};
pub use storage::{LocalStore, StorageRouter};
pub use pipeline::{Harvester, HarvesterBuilder};
