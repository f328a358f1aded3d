//! Page sessions and rasterization of the capture target.
//!
//! A [`PageSession`] is one loaded page: in production a Chrome tab
//! ([`ChromeSession`]), in tests a [`mock::MockSession`]. Sessions are opened
//! by a [`SessionProvider`], which for Chrome also owns the lazily launched
//! browser.
//!
//! # Capture Flow
//!
//! ```text
//! rasterize(session, "#mainContainer", 3.0)
//!     │
//!     ├─ element_rect()   box of the target in CSS px (document coordinates)
//!     ├─ capture_region() PNG of that box at 3 device px per CSS px
//!     └─ RasterImage::from_png()
//! ```

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::{ChromeSession, ChromeSessions};

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ExportError, Result};
use crate::loader::ScriptHost;
use crate::raster::RasterImage;
use crate::source::PageSource;

/// Bounding box of an element, in CSS pixels relative to the document.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
}

impl ElementRect {
    /// Build a rect from its edges and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box has no visible area.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Size in device pixels once captured at `scale`.
    pub fn scaled_size(&self, scale: f64) -> (u32, u32) {
        (
            (self.width * scale).round() as u32,
            (self.height * scale).round() as u32,
        )
    }
}

/// One loaded page the exporter can inspect and capture.
///
/// Extends [`ScriptHost`] so page-side libraries can be injected through the
/// [`LibraryLoader`](crate::loader::LibraryLoader).
pub trait PageSession: ScriptHost {
    /// Wait up to `timeout` for an element matching `selector`.
    ///
    /// Returns `false` if it never appeared.
    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Evaluate a JavaScript expression and return its JSON value.
    ///
    /// With `await_promise` the result of a returned promise is awaited.
    fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Option<serde_json::Value>>;

    /// Whether the page has set `window.isPageDone = true`.
    fn page_done(&self) -> Result<bool>;

    /// Bounding box of the first element matching `selector`, if any.
    fn element_rect(&self, selector: &str) -> Result<Option<ElementRect>>;

    /// Screenshot of `rect` as PNG, at `scale` device pixels per CSS pixel.
    fn capture_region(&self, rect: &ElementRect, scale: f64) -> Result<Vec<u8>>;

    /// Count clicks on `selector` from now on.
    ///
    /// Returns `false` if the element is missing. Attaching twice keeps a
    /// single listener.
    fn attach_click_listener(&self, selector: &str) -> Result<bool>;

    /// Take the number of clicks counted since the last call.
    ///
    /// Returns `None` when the listener is gone, e.g. after the page
    /// navigated away.
    fn take_clicks(&self) -> Result<Option<u64>>;

    /// Close the page. Best effort.
    fn close(&self);
}

/// Opens page sessions.
///
/// `Send + Sync` so the exporter can run on a blocking worker thread.
pub trait SessionProvider: Send + Sync {
    /// Open a new page and navigate it to `source`.
    ///
    /// # Errors
    ///
    /// - [`ExportError::BrowserCreation`] if the browser cannot be launched
    /// - [`ExportError::TabCreation`] if no tab can be opened
    /// - [`ExportError::Navigation`] if loading the page fails
    fn open(&self, source: &PageSource) -> Result<Box<dyn PageSession>>;
}

/// Rasterize the element matching `selector` at `scale`.
///
/// # Errors
///
/// - [`ExportError::TargetNotFound`] if no element matches
/// - [`ExportError::EmptyCapture`] if the element has no visible area
/// - [`ExportError::Capture`] / [`ExportError::ImageDecode`] from the
///   screenshot itself
pub fn rasterize(session: &dyn PageSession, selector: &str, scale: f64) -> Result<RasterImage> {
    let rect = session.element_rect(selector)?.ok_or_else(|| {
        log::error!("❌ Capture target '{}' not found", selector);
        ExportError::TargetNotFound(selector.to_string())
    })?;

    if rect.is_empty() {
        let (width, height) = rect.scaled_size(scale);
        log::error!(
            "❌ Capture target '{}' has no visible area ({}x{} CSS px)",
            selector,
            rect.width,
            rect.height
        );
        return Err(ExportError::EmptyCapture { width, height });
    }

    log::debug!(
        "📸 Capturing '{}' ({:.0}x{:.0} CSS px at {}x)",
        selector,
        rect.width,
        rect.height,
        scale
    );

    let png = session.capture_region(&rect, scale)?;
    let raster = RasterImage::from_png(&png)?;

    log::debug!(
        "Captured {}x{} px ({} PNG bytes)",
        raster.width(),
        raster.height(),
        png.len()
    );

    Ok(raster)
}

/// Expression returning the document-relative box of `selector` as a JSON
/// string, or `null` when nothing matches.
pub(crate) fn element_rect_js(selector: &str) -> String {
    let selector = serde_json::Value::String(selector.to_string()).to_string();
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return null;
    const r = el.getBoundingClientRect();
    return JSON.stringify({{ x: r.left + window.scrollX, y: r.top + window.scrollY, width: r.width, height: r.height }});
}})()"#
    )
}

/// Parse the value returned by [`element_rect_js`].
pub(crate) fn parse_element_rect(value: Option<serde_json::Value>) -> Result<Option<ElementRect>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(json)) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| ExportError::Script(format!("unexpected element box '{}': {}", json, e))),
        Some(other) => Err(ExportError::Script(format!(
            "unexpected element box value: {}",
            other
        ))),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
