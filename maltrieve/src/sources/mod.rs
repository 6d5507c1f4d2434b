pub mod builtin;

pub use builtin::builtin_adapters;

use crate::parser::FeedFormat;
use std::collections::BTreeSet;

/// A feed provider: a name, a direction tag, and one or more URLs that share
/// a body format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAdapter {
    pub name: &'static str,
    pub direction: &'static str,
    pub urls: &'static [&'static str],
    pub format: FeedFormat,
}

impl SourceAdapter {
    pub fn feed_sources(&self) -> impl Iterator<Item = FeedSource> + '_ {
        self.urls
            .iter()
            .map(move |url| FeedSource::new(self.name, *url, self.format))
    }
}

/// One feed URL bound to the parser for its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    pub format: FeedFormat,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, format: FeedFormat) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            format,
        }
    }

    pub fn extract_urls(&self, body: &str) -> BTreeSet<String> {
        self.format.extract_urls(body)
    }
}

/// Every feed URL of every built-in adapter.
pub fn default_feed_sources() -> Vec<FeedSource> {
    builtin_adapters()
        .iter()
        .flat_map(|adapter| adapter.feed_sources())
        .collect()
}
