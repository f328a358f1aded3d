//! Mock page sessions for testing.
//!
//! [`MockSession`] simulates a loaded page: a set of elements with boxes, a
//! `window.isPageDone` flag, a script tag list and a click counter.
//! Screenshots are synthetic PNGs of the requested size, so the rest of the
//! pipeline (decode, paginate, compose) runs for real.
//!
//! Only available with the `test-utils` feature or during `cargo test`.
//!
//! ```rust,ignore
//! use region2pdf::capture::mock::{MockSession, MockSessionProvider};
//!
//! let provider = MockSessionProvider::new(MockSession::dashboard(100.0, 300.0));
//! let session = provider.open(&source)?;
//! assert!(session.wait_for_selector("#mainContainer", timeout)?);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use super::{ElementRect, PageSession, SessionProvider};
use crate::config::{DEFAULT_TARGET_SELECTOR, DEFAULT_TRIGGER_SELECTOR};
use crate::error::{ExportError, Result};
use crate::loader::ScriptHost;
use crate::source::PageSource;

/// Observable state of a mock page.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    /// Host id reported to the library loader.
    pub id: String,
    /// URL the page was opened with.
    pub url: Option<String>,
    /// Elements present on the page, by selector.
    pub elements: HashMap<String, ElementRect>,
    /// Value of `window.isPageDone`.
    pub page_done: bool,
    /// Script URLs present as `<script>` tags, in insertion order.
    pub script_tags: Vec<String>,
    /// Number of `load_script` calls, including ones that found a tag.
    pub load_calls: usize,
    /// Script URLs the page ships itself, loaded before any injection.
    pub preloaded_scripts: HashSet<String>,
    /// Script URLs whose load fails.
    pub failing_scripts: HashSet<String>,
    /// Number of screenshots taken.
    pub captures: usize,
    /// Whether a click listener is installed.
    pub listener_attached: bool,
    /// Clicks delivered as soon as the listener is installed.
    pub queued_clicks: u64,
    /// Clicks counted by the listener and not yet taken.
    pub pending_clicks: u64,
    /// Clicks simulated while each screenshot is taken.
    pub clicks_per_capture: u64,
    /// Time each screenshot takes.
    pub capture_delay: Duration,
    /// Expressions passed to `evaluate`.
    pub evaluations: Vec<String>,
    /// Whether the page was closed.
    pub closed: bool,
}

/// A simulated page.
#[derive(Debug, Clone)]
pub struct MockSession {
    page: Arc<Mutex<MockPage>>,
}

impl MockSession {
    /// Empty page: no elements, not done.
    pub fn new() -> Self {
        Self::from_page(MockPage {
            id: "mock-page".to_string(),
            ..MockPage::default()
        })
    }

    /// Page with the default trigger and a capture target of the given size
    /// in CSS pixels, signalling `isPageDone`.
    pub fn dashboard(target_width: f64, target_height: f64) -> Self {
        Self::new()
            .with_element(DEFAULT_TRIGGER_SELECTOR, ElementRect::new(8.0, 8.0, 80.0, 24.0))
            .with_element(
                DEFAULT_TARGET_SELECTOR,
                ElementRect::new(0.0, 40.0, target_width, target_height),
            )
            .with_page_done(true)
    }

    fn from_page(page: MockPage) -> Self {
        Self {
            page: Arc::new(Mutex::new(page)),
        }
    }

    /// Add an element.
    pub fn with_element(self, selector: &str, rect: ElementRect) -> Self {
        self.page().elements.insert(selector.to_string(), rect);
        self
    }

    /// Remove an element.
    pub fn without_element(self, selector: &str) -> Self {
        self.page().elements.remove(selector);
        self
    }

    /// Set `window.isPageDone`.
    pub fn with_page_done(self, done: bool) -> Self {
        self.page().page_done = done;
        self
    }

    /// Make loading the script at `url` fail.
    pub fn with_failing_script(self, url: &str) -> Self {
        self.page().failing_scripts.insert(url.to_string());
        self
    }

    /// Ship a `<script>` for `url` with the page, already loaded.
    pub fn with_preloaded_script(self, url: &str) -> Self {
        {
            let mut page = self.page();
            page.preloaded_scripts.insert(url.to_string());
            page.script_tags.push(url.to_string());
        }
        self
    }

    /// Deliver `clicks` as soon as a listener is attached.
    pub fn with_queued_clicks(self, clicks: u64) -> Self {
        self.page().queued_clicks = clicks;
        self
    }

    /// Simulate `clicks` on the trigger during every screenshot.
    pub fn with_clicks_per_capture(self, clicks: u64) -> Self {
        self.page().clicks_per_capture = clicks;
        self
    }

    /// Make every screenshot take `delay`.
    pub fn with_capture_delay(self, delay: Duration) -> Self {
        self.page().capture_delay = delay;
        self
    }

    /// Click the trigger. Ignored while no listener is attached.
    pub fn click(&self) {
        let mut page = self.page();
        if page.listener_attached {
            page.pending_clicks += 1;
        }
    }

    /// Simulate a reload: listeners, counters and injected scripts are gone.
    pub fn reload(&self) {
        let mut page = self.page();
        page.listener_attached = false;
        page.pending_clicks = 0;
        let shipped: Vec<String> = page
            .script_tags
            .iter()
            .filter(|tag| page.preloaded_scripts.contains(*tag))
            .cloned()
            .collect();
        page.script_tags = shipped;
    }

    /// Snapshot of the page state.
    pub fn state(&self) -> MockPage {
        self.page().clone()
    }

    /// Independent copy of this page, with its own state.
    fn fork(&self, id: String, url: String) -> Self {
        let mut page = self.state();
        page.id = id;
        page.url = Some(url);
        Self::from_page(page)
    }

    fn page(&self) -> MutexGuard<'_, MockPage> {
        // A poisoned lock only happens after a panicking test thread.
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptHost for MockSession {
    fn host_id(&self) -> String {
        self.page().id.clone()
    }

    fn load_script(&self, url: &str) -> Result<()> {
        let mut page = self.page();
        page.load_calls += 1;

        if page.failing_scripts.contains(url) {
            return Err(ExportError::Script(format!("failed to load {}", url)));
        }

        if page.preloaded_scripts.contains(url) {
            log::trace!("MockSession: reusing page-shipped script {}", url);
            return Ok(());
        }
        if !page.script_tags.iter().any(|tag| tag == url) {
            page.script_tags.push(url.to_string());
        }
        Ok(())
    }
}

impl PageSession for MockSession {
    fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.page().elements.contains_key(selector))
    }

    fn evaluate(&self, expression: &str, _await_promise: bool) -> Result<Option<serde_json::Value>> {
        self.page().evaluations.push(expression.to_string());
        Ok(None)
    }

    fn page_done(&self) -> Result<bool> {
        Ok(self.page().page_done)
    }

    fn element_rect(&self, selector: &str) -> Result<Option<ElementRect>> {
        Ok(self.page().elements.get(selector).copied())
    }

    fn capture_region(&self, rect: &ElementRect, scale: f64) -> Result<Vec<u8>> {
        let (width, height) = rect.scaled_size(scale);
        let delay = {
            let mut page = self.page();
            page.captures += 1;
            if page.listener_attached {
                page.pending_clicks += page.clicks_per_capture;
            }
            page.capture_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        synthetic_png(width, height)
    }

    fn attach_click_listener(&self, selector: &str) -> Result<bool> {
        let mut page = self.page();
        if !page.elements.contains_key(selector) {
            return Ok(false);
        }
        if !page.listener_attached {
            page.listener_attached = true;
            page.pending_clicks += page.queued_clicks;
            page.queued_clicks = 0;
        }
        Ok(true)
    }

    fn take_clicks(&self) -> Result<Option<u64>> {
        let mut page = self.page();
        if !page.listener_attached {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut page.pending_clicks)))
    }

    fn close(&self) {
        self.page().closed = true;
    }
}

/// Opens [`MockSession`]s copied from a template page.
///
/// Every open gets its own state and host id (`mock-tab-1`, `mock-tab-2`,
/// ...), like tabs in a real browser.
#[derive(Debug)]
pub struct MockSessionProvider {
    template: MockSession,
    opened: Mutex<Vec<MockSession>>,
    open_count: AtomicUsize,
    fail_with: Option<String>,
}

impl MockSessionProvider {
    /// Provider serving copies of `template`.
    pub fn new(template: MockSession) -> Self {
        Self {
            template,
            opened: Mutex::new(Vec::new()),
            open_count: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    /// Provider whose every open fails with a navigation error.
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new(MockSession::new())
        }
    }

    /// Number of open attempts.
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Handles on every session opened so far.
    pub fn sessions(&self) -> Vec<MockSession> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

impl SessionProvider for MockSessionProvider {
    fn open(&self, source: &PageSource) -> Result<Box<dyn PageSession>> {
        let n = self.open_count.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(message) = &self.fail_with {
            log::debug!("MockSessionProvider: Returning configured failure");
            return Err(ExportError::Navigation(message.clone()));
        }

        let session = self
            .template
            .fork(format!("mock-tab-{}", n), source.navigation_url());
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(session.clone());
        }
        Ok(Box::new(session))
    }
}

/// A solid PNG of the given size.
fn synthetic_png(width: u32, height: u32) -> Result<Vec<u8>> {
    let image = RgbImage::from_pixel(width, height, Rgb([32, 96, 160]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ExportError::Capture(e.to_string()))?;
    Ok(bytes)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tags_are_not_duplicated() {
        let session = MockSession::new();
        session.load_script("http://cdn/a.js").unwrap();
        session.load_script("http://cdn/a.js").unwrap();

        let state = session.state();
        assert_eq!(state.load_calls, 2);
        assert_eq!(state.script_tags, vec!["http://cdn/a.js".to_string()]);
    }

    #[test]
    fn test_preloaded_script_survives_reload() {
        let session = MockSession::new().with_preloaded_script("http://cdn/pdf.js");
        session.load_script("http://cdn/pdf.js").unwrap();
        session.load_script("http://cdn/a.js").unwrap();
        assert_eq!(session.state().script_tags.len(), 2);

        session.reload();
        assert_eq!(session.state().script_tags, vec!["http://cdn/pdf.js".to_string()]);
    }

    #[test]
    fn test_clicks_need_listener() {
        let session = MockSession::dashboard(10.0, 10.0).with_queued_clicks(2);
        session.click();
        assert_eq!(session.take_clicks().unwrap(), None);

        assert!(session.attach_click_listener("#run").unwrap());
        session.click();
        assert_eq!(session.take_clicks().unwrap(), Some(3));
        assert_eq!(session.take_clicks().unwrap(), Some(0));
        assert!(!session.attach_click_listener("#missing").unwrap());
    }

    #[test]
    fn test_provider_forks_pages() {
        let provider = MockSessionProvider::new(MockSession::dashboard(10.0, 10.0));
        let source = PageSource::url("http://127.0.0.1:8050").unwrap();

        let first = provider.open(&source).unwrap();
        let second = provider.open(&source).unwrap();
        first.load_script("http://cdn/a.js").unwrap();

        assert_eq!(first.host_id(), "mock-tab-1");
        assert_eq!(second.host_id(), "mock-tab-2");

        let sessions = provider.sessions();
        assert_eq!(sessions[0].state().script_tags.len(), 1);
        assert!(sessions[1].state().script_tags.is_empty());
        assert_eq!(sessions[1].state().url.as_deref(), Some("http://127.0.0.1:8050/"));
    }

    #[test]
    fn test_failing_provider() {
        let provider = MockSessionProvider::failing("offline");
        let source = PageSource::url("http://127.0.0.1:8050").unwrap();
        assert!(matches!(provider.open(&source), Err(ExportError::Navigation(m)) if m == "offline"));
        assert_eq!(provider.open_count(), 1);
    }

    #[test]
    fn test_synthetic_png_decodes() {
        let png = synthetic_png(12, 7).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
    }
}
