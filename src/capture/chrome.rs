//! Chrome-backed page sessions.
//!
//! [`ChromeSessions`] owns the browser, launched on the first
//! [`open`](SessionProvider::open) through a [`LoadedOnce`] cell and reused
//! afterwards. Each session is one tab.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, Tab};

use super::{ElementRect, PageSession, SessionProvider, element_rect_js, parse_element_rect};
use crate::error::{ExportError, Result};
use crate::factory::BrowserFactory;
use crate::loader::{LoadedOnce, SCRIPT_LOADED, ScriptHost, inject_script_js};
use crate::source::PageSource;

/// Extra window height kept below the capture target when the window grows.
const WINDOW_MARGIN_PX: f64 = 64.0;

/// Chrome refuses windows taller than this.
const MAX_WINDOW_HEIGHT_PX: f64 = 16_384.0;

/// Opens Chrome tabs, launching the browser on first use.
pub struct ChromeSessions {
    factory: Box<dyn BrowserFactory>,
    browser: LoadedOnce<Browser>,
    window_size: (u32, u32),
}

impl ChromeSessions {
    /// Create a provider. Nothing is launched until the first session.
    pub fn new(factory: Box<dyn BrowserFactory>, window_size: (u32, u32)) -> Self {
        Self {
            factory,
            browser: LoadedOnce::new(),
            window_size,
        }
    }

    /// Whether the browser has been launched.
    pub fn is_launched(&self) -> bool {
        self.browser.is_loaded()
    }

    fn launch(&self) -> Result<Arc<Browser>> {
        self.browser.get_or_try_init(|| {
            log::info!("🚀 Launching browser for capture");
            self.factory.create()
        })
    }

    fn new_tab(&self) -> Result<Arc<Tab>> {
        let browser = self.launch()?;
        match browser.new_tab() {
            Ok(tab) => Ok(tab),
            Err(e) => {
                // The browser may have exited since the last export; relaunch once.
                log::warn!("⚠️ Failed to open tab ({}), relaunching browser", e);
                self.browser.reset();
                self.launch()?.new_tab().map_err(|e| {
                    log::error!("❌ Failed to open tab: {}", e);
                    ExportError::TabCreation(e.to_string())
                })
            }
        }
    }
}

impl SessionProvider for ChromeSessions {
    fn open(&self, source: &PageSource) -> Result<Box<dyn PageSession>> {
        let tab = self.new_tab()?;
        let url = source.navigation_url();

        log::debug!("🌐 Navigating to {}", source.describe());
        let navigated = tab
            .navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ());

        if let Err(e) = navigated {
            log::error!("❌ Navigation to {} failed: {}", source.describe(), e);
            close_tab_safely(&tab);
            return Err(ExportError::Navigation(e.to_string()));
        }

        Ok(Box::new(ChromeSession {
            tab,
            window_size: self.window_size,
        }))
    }
}

impl std::fmt::Debug for ChromeSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSessions")
            .field("launched", &self.browser.is_loaded())
            .field("window_size", &self.window_size)
            .finish()
    }
}

/// A page loaded in a Chrome tab.
pub struct ChromeSession {
    tab: Arc<Tab>,
    window_size: (u32, u32),
}

impl ChromeSession {
    /// Wrap an already navigated tab.
    pub fn new(tab: Arc<Tab>, window_size: (u32, u32)) -> Self {
        Self { tab, window_size }
    }

    /// Grow the window so the whole target is laid out and painted.
    ///
    /// Regions below the viewport are not rendered by the screenshot. The
    /// viewport is shorter than the window by the browser UI, which only
    /// shows in headed mode.
    fn fit_window_to(&self, rect: &ElementRect) -> Result<()> {
        let (viewport, chrome_ui) = self.viewport_metrics()?;
        let Some(height) = window_height_for(rect.bottom(), viewport, chrome_ui) else {
            return Ok(());
        };

        if height >= MAX_WINDOW_HEIGHT_PX {
            log::warn!(
                "⚠️ Capture target is {:.0} px tall; content below {:.0} px may be blank",
                rect.bottom(),
                MAX_WINDOW_HEIGHT_PX - chrome_ui
            );
        }

        log::trace!("Resizing window to {}x{}", self.window_size.0, height);
        self.tab
            .set_bounds(Bounds::Normal {
                left: None,
                top: None,
                width: Some(self.window_size.0 as f64),
                height: Some(height),
            })
            .map_err(|e| ExportError::Capture(format!("failed to resize window: {}", e)))?;
        Ok(())
    }

    /// Viewport height and the height taken by the browser UI, in CSS pixels.
    fn viewport_metrics(&self) -> Result<(f64, f64)> {
        let metrics: Option<serde_json::Value> = self
            .evaluate(VIEWPORT_METRICS_JS, false)?
            .and_then(|v| v.as_str().and_then(|json| serde_json::from_str(json).ok()));
        let read = |key: &str| {
            metrics
                .as_ref()
                .and_then(|m| m.get(key))
                .and_then(|v| v.as_f64())
        };
        let configured = self.window_size.1 as f64;
        let inner = read("inner").filter(|h| *h > 0.0).unwrap_or(configured);
        let outer = read("outer").filter(|h| *h > 0.0).unwrap_or(configured);
        Ok((inner, (outer - inner).max(0.0)))
    }
}

/// Reads the viewport and window heights as a JSON string.
const VIEWPORT_METRICS_JS: &str =
    "JSON.stringify({ inner: window.innerHeight, outer: window.outerHeight })";

/// Window height that fits `bottom` inside the viewport, or `None` when the
/// viewport is already tall enough.
fn window_height_for(bottom: f64, viewport: f64, chrome_ui: f64) -> Option<f64> {
    let needed = bottom + WINDOW_MARGIN_PX;
    if needed <= viewport {
        return None;
    }
    Some((needed + chrome_ui).min(MAX_WINDOW_HEIGHT_PX).ceil())
}

impl ScriptHost for ChromeSession {
    fn host_id(&self) -> String {
        self.tab.get_target_id().to_string()
    }

    fn load_script(&self, url: &str) -> Result<()> {
        let outcome = self.evaluate(&inject_script_js(url), true)?;
        match outcome.as_ref().and_then(|v| v.as_str()) {
            Some(SCRIPT_LOADED) => Ok(()),
            Some(reason) => Err(ExportError::Script(reason.to_string())),
            None => Err(ExportError::Script(format!(
                "script injection returned {:?}",
                outcome
            ))),
        }
    }
}

impl PageSession for ChromeSession {
    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        match self.tab.wait_for_element_with_custom_timeout(selector, timeout) {
            Ok(_) => Ok(true),
            Err(e) => {
                log::trace!("'{}' not found within {:?}: {}", selector, timeout, e);
                Ok(false)
            }
        }
    }

    fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Option<serde_json::Value>> {
        self.tab
            .evaluate(expression, await_promise)
            .map(|remote| remote.value)
            .map_err(|e| ExportError::Script(e.to_string()))
    }

    fn page_done(&self) -> Result<bool> {
        Ok(self
            .evaluate("window.isPageDone === true", false)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    fn element_rect(&self, selector: &str) -> Result<Option<ElementRect>> {
        parse_element_rect(self.evaluate(&element_rect_js(selector), false)?)
    }

    fn capture_region(&self, rect: &ElementRect, scale: f64) -> Result<Vec<u8>> {
        self.fit_window_to(rect)?;

        let clip = Page::Viewport {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            scale,
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| {
                log::error!("❌ Screenshot failed: {}", e);
                ExportError::Capture(e.to_string())
            })
    }

    fn attach_click_listener(&self, selector: &str) -> Result<bool> {
        Ok(self
            .evaluate(&click_listener_js(selector), false)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    fn take_clicks(&self) -> Result<Option<u64>> {
        Ok(self
            .evaluate(TAKE_CLICKS_JS, false)?
            .and_then(|v| v.as_f64())
            .map(|n| n.max(0.0) as u64))
    }

    fn close(&self) {
        close_tab_safely(&self.tab);
    }
}

/// Counter of trigger clicks, kept on `window`.
const CLICK_COUNTER: &str = "__region2pdfClicks";

/// Reads and resets the click counter; `null` when no listener is installed.
const TAKE_CLICKS_JS: &str = r#"(() => {
    if (typeof window.__region2pdfClicks !== 'number') return null;
    const n = window.__region2pdfClicks;
    window.__region2pdfClicks = 0;
    return n;
})()"#;

/// Installs a delegated click listener for `selector`.
///
/// The listener sits on `document`, so it keeps working when the page
/// re-renders the trigger element.
fn click_listener_js(selector: &str) -> String {
    let selector = serde_json::Value::String(selector.to_string()).to_string();
    format!(
        r#"(() => {{
    const selector = {selector};
    if (!document.querySelector(selector)) return false;
    if (typeof window.{CLICK_COUNTER} !== 'number') {{
        window.{CLICK_COUNTER} = 0;
        document.addEventListener('click', (event) => {{
            if (event.target instanceof Element && event.target.closest(selector)) {{
                window.{CLICK_COUNTER} += 1;
            }}
        }}, true);
    }}
    return true;
}})()"#
    )
}

/// Close a tab, ignoring errors.
///
/// The PDF is already written when this runs; a failed close only leaks a
/// tab until the browser exits.
fn close_tab_safely(tab: &Tab) {
    log::trace!("Closing tab");
    if let Err(e) = tab.close(true) {
        log::warn!("⚠️ Failed to close tab (continuing anyway): {}", e);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::mock::MockBrowserFactory;

    #[test]
    fn test_click_listener_js_uses_delegation() {
        let js = click_listener_js("#run");
        assert!(js.contains(r##"const selector = "#run";"##));
        assert!(js.contains("document.addEventListener('click'"));
        assert!(js.contains("closest(selector)"));
        assert!(js.contains("window.__region2pdfClicks += 1"));
    }

    #[test]
    fn test_window_fits_viewport_not_outer_window() {
        // Headed window: 1080 px outer, 940 px viewport.
        assert_eq!(window_height_for(800.0, 940.0, 140.0), None);
        assert_eq!(window_height_for(900.0, 940.0, 140.0), Some(1104.0));
        assert_eq!(window_height_for(900.0, 1080.0, 0.0), None);
        assert_eq!(
            window_height_for(20_000.0, 940.0, 140.0),
            Some(MAX_WINDOW_HEIGHT_PX)
        );
    }

    #[test]
    fn test_take_clicks_js_resets_counter() {
        assert!(TAKE_CLICKS_JS.contains("return null"));
        assert!(TAKE_CLICKS_JS.contains("window.__region2pdfClicks = 0"));
    }

    #[test]
    fn test_sessions_launch_lazily() {
        let sessions = ChromeSessions::new(
            Box::new(MockBrowserFactory::always_fails("no chrome")),
            (1920, 1080),
        );
        assert!(!sessions.is_launched());
        assert!(format!("{:?}", sessions).contains("launched: false"));
    }

    #[test]
    fn test_failed_launch_is_retried_on_next_open() {
        let factory = MockBrowserFactory::always_fails("no chrome");
        let counter = factory.counter();
        let sessions = ChromeSessions::new(Box::new(factory), (1920, 1080));
        let source = PageSource::url("http://127.0.0.1:8050").unwrap();

        for attempt in 1..=2 {
            let result = sessions.open(&source);
            assert!(matches!(result, Err(ExportError::BrowserCreation(_))));
            assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), attempt);
        }
        assert!(!sessions.is_launched());
    }
}
