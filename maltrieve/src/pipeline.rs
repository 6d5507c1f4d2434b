use crate::classifier::{Classifier, FilterVerdict};
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::sources::{default_feed_sources, FeedSource};
use crate::state::{DedupState, DedupStore};
use crate::storage::{LocalStore, StorageRouter};
use crate::submitters::build_submitters;
use crate::traits::Submitter;
use crate::types::{Download, Result, RoutingOutcome, RunSummary};
use tracing::{debug, info, warn};

/// What became of one downloaded sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedSample {
    pub source_url: String,
    pub content_hash: String,
    pub outcome: RoutingOutcome,
}

/// One single-shot harvesting run:
/// load state, fetch feeds, extract and dedup URLs, download in waves,
/// classify and route each sample, then persist state.
///
/// Nothing is persisted until the very end, so a run aborted part-way leaves
/// the previous state untouched.
pub struct Harvester {
    sources: Vec<FeedSource>,
    fetcher: Fetcher,
    classifier: Classifier,
    router: StorageRouter,
    store: DedupStore,
    wave_size: usize,
}

impl Harvester {
    pub fn new(config: &Config) -> Result<Self> {
        HarvesterBuilder::new(config.clone()).build()
    }

    pub fn builder(config: Config) -> HarvesterBuilder {
        HarvesterBuilder::new(config)
    }

    /// Log the address remote sites see. Only meaningful behind a proxy.
    pub async fn report_external_ip(&self) {
        match self.fetcher.external_ip().await {
            Ok(ip) => info!("External sites see {}", ip),
            Err(e) => warn!("Could not determine external address: {}", e),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut state = self.store.load();
        info!(
            "Loaded {} past URLs and {} hashes",
            state.urls.len(),
            state.hashes.len()
        );

        let mut summary = RunSummary {
            feeds_requested: self.sources.len(),
            ..RunSummary::default()
        };

        info!("Processing source URLs");
        let harvest = self.fetcher.fetch_candidate_urls(&self.sources).await;
        summary.feeds_fetched = harvest.feeds_fetched;
        summary.candidates = harvest.urls.len();

        let pending: Vec<String> = harvest
            .urls
            .into_iter()
            .filter(|url| !state.is_seen(url))
            .collect();
        summary.already_seen = summary.candidates - pending.len();

        info!(
            "Downloading {} samples ({} already seen)",
            pending.len(),
            summary.already_seen
        );

        for (index, wave) in pending.chunks(self.wave_size).enumerate() {
            debug!("Starting wave {} with {} requests", index + 1, wave.len());
            let downloads = self.fetcher.fetch_wave(wave).await;
            summary.downloaded += downloads.len();

            for download in downloads {
                let processed = self.process(download).await;
                summary.record(&processed.outcome);
                if processed.outcome.is_stored() {
                    state.record(processed.source_url, processed.content_hash);
                }
            }
        }

        info!("Completed downloads");
        self.persist(&state)?;

        info!(
            "Run finished: {} stored externally, {} stored locally, {} filtered, {} failed",
            summary.stored_externally, summary.stored_locally, summary.filtered, summary.failed
        );
        Ok(summary)
    }

    /// Classify one download and route it unless the MIME policy rejects it.
    pub async fn process(&self, download: Download) -> ProcessedSample {
        if download.final_url != download.url {
            debug!("{} redirected to {}", download.url, download.final_url);
        }

        let (sample, verdict) = self.classifier.evaluate(download);
        info!("{} hashes to {}", sample.source_url, sample.content_hash);

        let outcome = match verdict {
            FilterVerdict::Accept => self.router.route(&sample).await,
            FilterVerdict::Denied => {
                info!("{} in ignore list for {}", sample.mime_type, sample.source_url);
                RoutingOutcome::Filtered {
                    reason: format!("{} is deny-listed", sample.mime_type),
                }
            }
            FilterVerdict::NotAllowed => {
                info!("{} not in whitelist for {}", sample.mime_type, sample.source_url);
                RoutingOutcome::Filtered {
                    reason: format!("{} is not allow-listed", sample.mime_type),
                }
            }
        };

        ProcessedSample {
            source_url: sample.source_url,
            content_hash: sample.content_hash,
            outcome,
        }
    }

    fn persist(&self, state: &DedupState) -> Result<()> {
        self.store.save(state)
    }
}

/// Wires a [`Harvester`] from a [`Config`], with optional overrides for the
/// feed list and the submission services.
pub struct HarvesterBuilder {
    config: Config,
    sources: Option<Vec<FeedSource>>,
    submitters: Option<Vec<Box<dyn Submitter>>>,
}

impl HarvesterBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sources: None,
            submitters: None,
        }
    }

    pub fn sources(mut self, sources: Vec<FeedSource>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn submitters(mut self, submitters: Vec<Box<dyn Submitter>>) -> Self {
        self.submitters = Some(submitters);
        self
    }

    pub fn build(self) -> Result<Harvester> {
        let config = self.config;

        let submitters = match self.submitters {
            Some(submitters) => submitters,
            None => build_submitters(&config.services)?,
        };
        let router = StorageRouter::new(
            submitters,
            LocalStore::new(config.dump_dir.clone(), config.sort_mime),
        );
        debug!("Submission order: {:?}", router.submitter_names());

        Ok(Harvester {
            sources: self.sources.unwrap_or_else(default_feed_sources),
            wave_size: config.fetch.wave_size.max(1),
            fetcher: Fetcher::new(config.fetch.clone())?,
            classifier: Classifier::new(config.mime_filter.clone()),
            router,
            store: DedupStore::new(config.state_dir.clone()),
        })
    }
}
