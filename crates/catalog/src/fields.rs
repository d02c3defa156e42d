//! Field validation shared by the catalog entities.

use url::Url;

use citycat_core::{CatalogError, CatalogResult};

pub use citycat_core::required;

/// A media reference handed back by the object store. Only absolute http(s) URLs with a
/// host are accepted; the bytes behind them are never inspected here.
pub fn media_url(field: &str, value: String) -> CatalogResult<String> {
    let raw = required(field, value)?;
    let invalid = || CatalogError::validation(format!("{field} must be an http(s) URL"));

    // The URL parser silently drops tabs and newlines; stored values must be exact.
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }
    let url = Url::parse(&raw).map_err(|_| invalid())?;
    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    if !matches!(url.scheme(), "http" | "https") || !has_host {
        return Err(invalid());
    }
    Ok(raw)
}

pub fn media_urls(field: &str, values: Vec<String>) -> CatalogResult<Vec<String>> {
    values.into_iter().map(|v| media_url(field, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_accepts_http_and_https() {
        assert_eq!(
            media_url("image", "https://cdn.example.com/a.png".into()).unwrap(),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(media_url("image", " http://x ".into()).unwrap(), "http://x");
        assert!(media_url("image", "HTTPS://cdn.example.com:8443/a.png?w=200".into()).is_ok());
    }

    #[test]
    fn media_url_rejects_other_schemes() {
        assert!(media_url("image", "ftp://x/a.png".into()).is_err());
        assert!(media_url("image", "https://".into()).is_err());
        assert!(media_url("image", "".into()).is_err());
        assert!(media_url("image", "mailto:ops@example.com".into()).is_err());
    }

    #[test]
    fn media_url_rejects_malformed_urls() {
        for raw in ["https://:::", "http://[", "https://a\tb", "https://a b.png", "cdn.example.com/a.png"] {
            assert!(media_url("image", raw.to_string()).is_err(), "{raw:?} was accepted");
        }
    }
}
