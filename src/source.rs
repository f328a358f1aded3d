//! Where the page to capture comes from.

use std::path::Path;

use crate::error::{ExportError, Result};

/// Page to load before capturing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// A normalized URL (http, https, file or data).
    Url(String),
    /// Inline HTML, loaded through a `data:` URL.
    Html(String),
}

impl PageSource {
    /// Validate and normalize a URL.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidSource`] for an empty or unparsable URL.
    pub fn url(url: &str) -> Result<Self> {
        validate_url(url).map(PageSource::Url)
    }

    /// Wrap HTML content.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidSource`] if the content is blank.
    pub fn html(html: impl Into<String>) -> Result<Self> {
        let html = html.into();
        if html.trim().is_empty() {
            return Err(ExportError::InvalidSource("HTML content is required".to_string()));
        }
        Ok(PageSource::Html(html))
    }

    /// Interpret a command-line argument.
    ///
    /// An existing file ending in `.html` or `.htm` is read as HTML content;
    /// anything else must be a URL.
    pub fn from_arg(arg: &str) -> Result<Self> {
        let path = Path::new(arg);
        let is_html_file = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));

        if is_html_file && path.is_file() {
            log::debug!("Reading HTML page from {}", path.display());
            let html = std::fs::read_to_string(path)?;
            return Self::html(html);
        }

        Self::url(arg)
    }

    /// URL the browser navigates to.
    pub fn navigation_url(&self) -> String {
        match self {
            PageSource::Url(url) => url.clone(),
            PageSource::Html(html) => {
                format!("data:text/html;charset=utf-8,{}", urlencoding::encode(html))
            }
        }
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            PageSource::Url(url) => truncate(url, 100),
            PageSource::Html(html) => format!("inline HTML ({} bytes)", html.len()),
        }
    }
}

fn validate_url(url: &str) -> Result<String> {
    if url.trim().is_empty() {
        log::debug!("URL validation failed: empty URL");
        return Err(ExportError::InvalidSource("URL is required".to_string()));
    }

    match url::Url::parse(url.trim()) {
        Ok(parsed) => {
            log::trace!("URL validated successfully: {}", parsed);
            Ok(parsed.to_string())
        }
        Err(e) => {
            log::debug!("URL validation failed for '{}': {}", url, e);
            Err(ExportError::InvalidSource(format!("{}: {}", url, e)))
        }
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_url_normalized() {
        let source = PageSource::url("http://127.0.0.1:8050").unwrap();
        assert_eq!(source, PageSource::Url("http://127.0.0.1:8050/".to_string()));
    }

    #[test]
    fn test_url_rejects_bad_input() {
        for bad in ["", "   ", "example.com", "/path/to/page"] {
            assert!(
                matches!(PageSource::url(bad), Err(ExportError::InvalidSource(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_html_requires_content() {
        assert!(PageSource::html(" \n").is_err());
        assert!(PageSource::html("<div id=\"mainContainer\"></div>").is_ok());
    }

    #[test]
    fn test_html_navigation_url_is_encoded() {
        let source = PageSource::html("<h1>Hi there</h1>").unwrap();
        assert_eq!(
            source.navigation_url(),
            "data:text/html;charset=utf-8,%3Ch1%3EHi%20there%3C%2Fh1%3E"
        );
        assert_eq!(source.describe(), "inline HTML (17 bytes)");
    }

    #[test]
    fn test_from_arg_reads_html_file() {
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        write!(file, "<div id=\"mainContainer\">report</div>").unwrap();

        let source = PageSource::from_arg(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(source, PageSource::Html(ref h) if h.contains("report")));
    }

    #[test]
    fn test_from_arg_falls_back_to_url() {
        let source = PageSource::from_arg("https://example.com/dash").unwrap();
        assert_eq!(source.navigation_url(), "https://example.com/dash");
        assert!(PageSource::from_arg("missing-file.html").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
        assert_eq!(truncate("ééé", 3), "é...");
    }
}
