use crate::sources::FeedSource;
use crate::types::{Download, FetchConfig, MaltrieveError, Result};
use futures::future::join_all;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Echo service used to report the address the outside world sees.
pub const IP_ECHO_URL: &str = "http://ipinfo.io/ip";

/// Candidate URLs gathered from one pass over the feed list.
#[derive(Debug, Clone, Default)]
pub struct FeedHarvest {
    pub feeds_fetched: usize,
    pub urls: BTreeSet<String>,
}

pub struct Fetcher {
    feed_client: Client,
    sample_client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let feed_client = Self::client_builder(&config)?
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        // Samples are stored byte-for-byte as served; never decode them.
        let sample_client = Self::client_builder(&config)?
            .no_gzip()
            .no_deflate()
            .no_brotli()
            .build()?;

        Ok(Self {
            feed_client,
            sample_client,
            config,
        })
    }

    fn client_builder(config: &FetchConfig) -> Result<reqwest::ClientBuilder> {
        let mut builder = Client::builder();
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::http(proxy.as_str())?);
        }
        Ok(builder)
    }

    /// Fetch every feed concurrently and union the URLs their adapters
    /// extract. Feeds that fail for any reason are logged and skipped.
    pub async fn fetch_candidate_urls(&self, sources: &[FeedSource]) -> FeedHarvest {
        let bodies = join_all(sources.iter().map(|source| self.fetch_feed(&source.url))).await;

        let mut harvest = FeedHarvest::default();
        for (source, body) in sources.iter().zip(bodies) {
            match body {
                Ok(body) => {
                    let urls = source.extract_urls(&body);
                    debug!("{} ({}) yielded {} URLs", source.name, source.url, urls.len());
                    harvest.feeds_fetched += 1;
                    harvest.urls.extend(urls);
                }
                Err(e) => warn!("Dropping feed {} ({}): {}", source.name, source.url, e),
            }
        }

        info!(
            "Completed source processing: {}/{} feeds, {} candidate URLs",
            harvest.feeds_fetched,
            sources.len(),
            harvest.urls.len()
        );
        harvest
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        debug!("Fetching feed: {}", url);

        let response = self
            .feed_client
            .get(url)
            .header(USER_AGENT, self.config.feed_user_agent.as_str())
            .timeout(Duration::from_secs(self.config.feed_timeout_seconds))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaltrieveError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content = response.text().await?;
        info!("Successfully fetched feed: {} ({} bytes)", url, content.len());
        Ok(content)
    }

    /// Issue one GET per URL concurrently and wait for all of them. Failed
    /// requests are dropped without affecting the rest of the wave.
    pub async fn fetch_wave(&self, urls: &[String]) -> Vec<Download> {
        let results = join_all(urls.iter().map(|url| self.fetch_sample(url))).await;

        urls.iter()
            .zip(results)
            .filter_map(|(url, result)| match result {
                Ok(download) => Some(download),
                Err(e) => {
                    warn!("Dropping sample {}: {}", url, e);
                    None
                }
            })
            .collect()
    }

    pub async fn fetch_sample(&self, url: &str) -> Result<Download> {
        let response = self
            .sample_client
            .get(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .send()
            .await?;

        if self.config.log_headers {
            debug!("Response headers for {}: {:?}", url, response.headers());
        }

        let status = response.status();
        if !status.is_success() {
            return Err(MaltrieveError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let bytes = response.bytes().await?.to_vec();
        debug!("Downloaded {} ({} bytes)", url, bytes.len());

        Ok(Download {
            url: url.to_string(),
            final_url,
            bytes,
        })
    }

    /// Address remote sites see for our requests, fetched through the proxy.
    pub async fn external_ip(&self) -> Result<String> {
        let response = self
            .feed_client
            .get(IP_ECHO_URL)
            .header(USER_AGENT, self.config.feed_user_agent.as_str())
            .timeout(Duration::from_secs(self.config.feed_timeout_seconds))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?.trim().to_string())
    }
}
