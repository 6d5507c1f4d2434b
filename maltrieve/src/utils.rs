/// Helpers for the loosely formatted URLs found in feeds
pub mod url {
    use url::Url;

    /// Feeds frequently double-escape ampersands.
    pub fn unescape_amp(raw: &str) -> String {
        raw.replace("&amp;", "&")
    }

    /// Prefix `http://` unless the string already starts with an http scheme.
    pub fn ensure_scheme(raw: &str) -> String {
        if raw.starts_with("http") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        }
    }

    pub fn extract_host(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }
}

pub mod mime {
    /// Directory name used when sorting samples by MIME type.
    pub fn directory_name(mime_type: &str) -> String {
        mime_type
            .chars()
            .map(|c| match c {
                '/' | '\\' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    }
}
