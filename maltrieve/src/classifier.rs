//! Content hashing, MIME sniffing and the allow/deny policy.
//!
//! The MIME type always comes from the bytes themselves. Distribution sites
//! routinely lie in their `Content-Type` headers.

use crate::types::{Download, Sample};
use std::collections::BTreeSet;

pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
pub const MIME_EMPTY: &str = "application/x-empty";

/// How many leading bytes are inspected when deciding whether a sample is text.
const TEXT_PROBE_LEN: usize = 8192;

/// Byte signature at a fixed offset
#[derive(Debug, Clone)]
pub struct MagicSignature {
    pub offset: usize,
    pub bytes: &'static [u8],
    pub mime_type: &'static str,
}

impl MagicSignature {
    pub fn matches(&self, data: &[u8]) -> bool {
        data.len() >= self.offset + self.bytes.len()
            && &data[self.offset..self.offset + self.bytes.len()] == self.bytes
    }
}

/// Checked in order; more specific signatures come first.
pub static MAGIC_SIGNATURES: &[MagicSignature] = &[
    MagicSignature { offset: 0, bytes: b"MZ", mime_type: "application/x-dosexec" },
    MagicSignature { offset: 0, bytes: &[0x7F, b'E', b'L', b'F'], mime_type: "application/x-executable" },
    MagicSignature { offset: 0, bytes: &[0xFE, 0xED, 0xFA, 0xCE], mime_type: "application/x-mach-binary" },
    MagicSignature { offset: 0, bytes: &[0xFE, 0xED, 0xFA, 0xCF], mime_type: "application/x-mach-binary" },
    MagicSignature { offset: 0, bytes: &[0xCE, 0xFA, 0xED, 0xFE], mime_type: "application/x-mach-binary" },
    MagicSignature { offset: 0, bytes: &[0xCF, 0xFA, 0xED, 0xFE], mime_type: "application/x-mach-binary" },
    MagicSignature { offset: 0, bytes: b"dex\n", mime_type: "application/vnd.android.dex" },
    MagicSignature { offset: 0, bytes: &[b'P', b'K', 0x03, 0x04], mime_type: "application/zip" },
    MagicSignature { offset: 0, bytes: &[b'P', b'K', 0x05, 0x06], mime_type: "application/zip" },
    MagicSignature { offset: 0, bytes: &[b'R', b'a', b'r', b'!', 0x1A, 0x07], mime_type: "application/x-rar" },
    MagicSignature { offset: 0, bytes: &[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C], mime_type: "application/x-7z-compressed" },
    MagicSignature { offset: 0, bytes: &[0x1F, 0x8B], mime_type: "application/gzip" },
    MagicSignature { offset: 0, bytes: b"BZh", mime_type: "application/x-bzip2" },
    MagicSignature { offset: 0, bytes: &[0xFD, b'7', b'z', b'X', b'Z', 0x00], mime_type: "application/x-xz" },
    MagicSignature { offset: 0, bytes: b"MSCF", mime_type: "application/vnd.ms-cab-compressed" },
    MagicSignature { offset: 257, bytes: b"ustar", mime_type: "application/x-tar" },
    MagicSignature { offset: 0, bytes: &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1], mime_type: "application/vnd.ms-office" },
    MagicSignature { offset: 0, bytes: b"%PDF-", mime_type: "application/pdf" },
    MagicSignature { offset: 0, bytes: b"{\\rtf", mime_type: "text/rtf" },
    MagicSignature { offset: 0, bytes: b"FWS", mime_type: "application/x-shockwave-flash" },
    MagicSignature { offset: 0, bytes: b"CWS", mime_type: "application/x-shockwave-flash" },
    MagicSignature { offset: 0, bytes: b"ZWS", mime_type: "application/x-shockwave-flash" },
    MagicSignature { offset: 0, bytes: &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A], mime_type: "image/png" },
    MagicSignature { offset: 0, bytes: &[0xFF, 0xD8, 0xFF], mime_type: "image/jpeg" },
    MagicSignature { offset: 0, bytes: b"GIF87a", mime_type: "image/gif" },
    MagicSignature { offset: 0, bytes: b"GIF89a", mime_type: "image/gif" },
];

/// MIME type and digest of a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub mime_type: String,
    pub content_hash: String,
}

pub fn classify(bytes: &[u8]) -> Classification {
    Classification {
        mime_type: sniff_mime(bytes).to_string(),
        content_hash: content_hash(bytes),
    }
}

/// Hex MD5 of the bytes. Also the on-disk file name of locally stored samples.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.is_empty() {
        return MIME_EMPTY;
    }
    if let Some(signature) = MAGIC_SIGNATURES.iter().find(|s| s.matches(bytes)) {
        return signature.mime_type;
    }
    if looks_like_text(bytes) {
        return sniff_text(bytes);
    }
    MIME_OCTET_STREAM
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let probe = &bytes[..bytes.len().min(TEXT_PROBE_LEN)];
    match std::str::from_utf8(probe) {
        Ok(text) => !text.chars().any(|c| c.is_control() && !c.is_whitespace()),
        // A multi-byte sequence cut off by the probe window is still text
        Err(e) => e.error_len().is_none() && looks_like_text(&probe[..e.valid_up_to()]),
    }
}

fn sniff_text(bytes: &[u8]) -> &'static str {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();

    if head.starts_with("#!") {
        "text/x-shellscript"
    } else if head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<head") {
        "text/html"
    } else if head.starts_with("<?xml") {
        "text/xml"
    } else {
        "text/plain"
    }
}

/// Why a MIME type was or was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accept,
    Denied,
    NotAllowed,
}

impl FilterVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterVerdict::Accept)
    }
}

/// Deny-list and allow-list of MIME types. A missing list places no
/// restriction; the deny-list always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeFilter {
    deny: Option<BTreeSet<String>>,
    allow: Option<BTreeSet<String>>,
}

impl MimeFilter {
    pub fn new(deny: Option<Vec<String>>, allow: Option<Vec<String>>) -> Self {
        Self {
            deny: deny.and_then(normalize_list),
            allow: allow.and_then(normalize_list),
        }
    }

    pub fn deny_list(&self) -> Option<&BTreeSet<String>> {
        self.deny.as_ref()
    }

    pub fn allow_list(&self) -> Option<&BTreeSet<String>> {
        self.allow.as_ref()
    }

    pub fn verdict(&self, mime_type: &str) -> FilterVerdict {
        if self.deny.as_ref().is_some_and(|deny| deny.contains(mime_type)) {
            return FilterVerdict::Denied;
        }
        if self.allow.as_ref().is_some_and(|allow| !allow.contains(mime_type)) {
            return FilterVerdict::NotAllowed;
        }
        FilterVerdict::Accept
    }
}

// An empty list restricts nothing
fn normalize_list(list: Vec<String>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = list
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect();
    (!set.is_empty()).then_some(set)
}

pub struct Classifier {
    filter: MimeFilter,
}

impl Classifier {
    pub fn new(filter: MimeFilter) -> Self {
        Self { filter }
    }

    /// Turn a download into a sample and decide whether it may be stored.
    pub fn evaluate(&self, download: Download) -> (Sample, FilterVerdict) {
        let Classification {
            mime_type,
            content_hash,
        } = classify(&download.bytes);
        let verdict = self.filter.verdict(&mime_type);

        let sample = Sample {
            source_url: download.url,
            bytes: download.bytes,
            mime_type,
            content_hash,
        };
        (sample, verdict)
    }
}
