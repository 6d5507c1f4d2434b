use crate::utils::url::{ensure_scheme, unescape_amp};
use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::debug;

/// Class marker on the result tables of the scraped HTML source.
const TABLE_SELECTOR: &str = "table.test";

/// Syntax of a feed body. Every variant maps a body to candidate URLs
/// without side effects; malformed entries are dropped, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedFormat {
    /// Syndication feed with the URL embedded in each entry's description
    DescriptionList,
    /// Syndication feed whose entry titles are the URLs
    TitleList,
    /// Plain text, one URL per line
    LineList,
    /// HTML page with URLs as anchor text inside marked tables
    TableScrape,
}

impl FeedFormat {
    pub fn extract_urls(&self, body: &str) -> BTreeSet<String> {
        match self {
            FeedFormat::DescriptionList => extract_description_list(body),
            FeedFormat::TitleList => extract_title_list(body),
            FeedFormat::LineList => extract_line_list(body),
            FeedFormat::TableScrape => extract_table_scrape(body),
        }
    }
}

/// Title and description of one syndication entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub fn extract_description_list(body: &str) -> BTreeSet<String> {
    syndication_items(body)
        .iter()
        .filter_map(|item| item.description.as_deref())
        .filter_map(url_from_description)
        .collect()
}

pub fn extract_title_list(body: &str) -> BTreeSet<String> {
    syndication_items(body)
        .into_iter()
        .filter_map(|item| item.title)
        .map(|title| unescape_amp(title.trim()))
        .filter(|title| !title.is_empty())
        .collect()
}

pub fn extract_line_list(body: &str) -> BTreeSet<String> {
    body.lines()
        .filter(|line| line.starts_with("http"))
        .map(|line| unescape_amp(line.trim()))
        .collect()
}

pub fn extract_table_scrape(body: &str) -> BTreeSet<String> {
    let (Ok(tables), Ok(anchors)) = (Selector::parse(TABLE_SELECTOR), Selector::parse("a")) else {
        return BTreeSet::new();
    };
    let document = Html::parse_document(body);

    let mut urls = BTreeSet::new();
    for table in document.select(&tables) {
        for anchor in table.select(&anchors) {
            let text: String = anchor.text().collect();
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            urls.insert(format!("http://{}", unescape_amp(text)));
        }
    }
    urls
}

/// Pull the URL out of a description such as
/// `URL: evil.example/a.exe, IP Address: 10.0.0.1, ...`.
///
/// The URL is normally the second space-separated token. Some providers put a
/// `-` placeholder (or an extra space) there and carry the address in the
/// fifth token instead.
pub fn url_from_description(description: &str) -> Option<String> {
    let tokens: Vec<&str> = description.trim().split(' ').collect();

    let mut candidate = tokens.get(1)?.trim_end_matches(',');
    if candidate.is_empty() || candidate == "-" {
        candidate = tokens.get(4)?.trim_end_matches(',');
    }
    if candidate.is_empty() || candidate == "-" {
        return None;
    }

    Some(ensure_scheme(&unescape_amp(candidate)))
}

/// Entries of an RSS/Atom document. Strict parsing through feed-rs first;
/// documents it rejects are scanned leniently for item-like elements.
pub fn syndication_items(body: &str) -> Vec<FeedItem> {
    match parser::parse(body.as_bytes()) {
        Ok(feed) => {
            debug!("Parsed feed with {} entries", feed.entries.len());
            feed.entries
                .into_iter()
                .map(|entry| FeedItem {
                    title: entry.title.map(|t| t.content),
                    description: entry.summary.map(|s| s.content),
                })
                .collect()
        }
        Err(e) => {
            debug!("Strict feed parse failed ({}), scanning leniently", e);
            scan_items(body)
        }
    }
}

#[derive(Clone, Copy)]
enum ItemField {
    Title,
    Description,
}

fn scan_items(body: &str) -> Vec<FeedItem> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut field: Option<ItemField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => current = Some(FeedItem::default()),
                b"title" => field = Some(ItemField::Title),
                b"description" | b"summary" => field = Some(ItemField::Description),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
                b"title" | b"description" | b"summary" => field = None,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                append_field(current.as_mut(), field, &text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append_field(current.as_mut(), field, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Stopping lenient scan at byte {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
    }

    items
}

fn append_field(item: Option<&mut FeedItem>, field: Option<ItemField>, text: &str) {
    let (Some(item), Some(field)) = (item, field) else {
        return;
    };
    let slot = match field {
        ItemField::Title => &mut item.title,
        ItemField::Description => &mut item.description,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}
