use super::SourceAdapter;
use crate::parser::FeedFormat;

pub const OUTBOUND: &str = "outbound";

static BUILTIN_ADAPTERS: &[SourceAdapter] = &[
    SourceAdapter {
        name: "zeustracker",
        direction: OUTBOUND,
        urls: &["https://zeustracker.abuse.ch/monitor.php?urlfeed=binaries"],
        format: FeedFormat::DescriptionList,
    },
    SourceAdapter {
        name: "malwaredomainlist",
        direction: OUTBOUND,
        urls: &["http://www.malwaredomainlist.com/hostslist/mdl.xml"],
        format: FeedFormat::DescriptionList,
    },
    SourceAdapter {
        name: "malc0de",
        direction: OUTBOUND,
        urls: &["http://malc0de.com/rss/"],
        format: FeedFormat::DescriptionList,
    },
    SourceAdapter {
        name: "vxvault",
        direction: OUTBOUND,
        urls: &["http://vxvault.net/URL_List.php"],
        format: FeedFormat::LineList,
    },
    SourceAdapter {
        name: "urlquery",
        direction: OUTBOUND,
        urls: &["https://urlquery.net/"],
        format: FeedFormat::TableScrape,
    },
    SourceAdapter {
        name: "cleanmx",
        direction: OUTBOUND,
        urls: &["http://support.clean-mx.de/clean-mx/rss?scope=viruses&limit=0%2C64"],
        format: FeedFormat::TitleList,
    },
    SourceAdapter {
        name: "joxeankoret",
        direction: OUTBOUND,
        urls: &["http://malwareurls.joxeankoret.com/normal.txt"],
        format: FeedFormat::LineList,
    },
];

/// The statically registered feed table.
pub fn builtin_adapters() -> &'static [SourceAdapter] {
    BUILTIN_ADAPTERS
}
