//! Chrome/Chromium browser factory implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use region2pdf::ChromeBrowserFactory;
//!
//! // Auto-detect Chrome installation, headless, 1920x1080
//! let factory = ChromeBrowserFactory::with_defaults();
//!
//! // Visible window for listen mode
//! let factory = ChromeBrowserFactory::from_config(&config);
//! ```

use std::ffi::OsStr;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions};

use super::BrowserFactory;
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};

/// How long the browser may sit without DevTools traffic before
/// `headless_chrome` tears the connection down.
///
/// Listen mode can wait a long time between clicks.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Factory for creating Chrome/Chromium browser instances.
///
/// Launch options are produced by a function, called once per browser.
pub struct ChromeBrowserFactory {
    launch_options_fn: Box<dyn Fn() -> Result<LaunchOptions<'static>> + Send + Sync>,
}

impl ChromeBrowserFactory {
    /// Create factory with custom launch options function.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use region2pdf::{ChromeBrowserFactory, create_chrome_options, ExportError};
    ///
    /// let factory = ChromeBrowserFactory::new(|| {
    ///     create_chrome_options(Some("/custom/path"), true, (1280, 720))
    ///         .map_err(|e| ExportError::Configuration(e.to_string()))
    /// });
    /// ```
    pub fn new<F>(launch_options_fn: F) -> Self
    where
        F: Fn() -> Result<LaunchOptions<'static>> + Send + Sync + 'static,
    {
        Self {
            launch_options_fn: Box::new(launch_options_fn),
        }
    }

    /// Headless Chrome at an auto-detected path with a 1920x1080 window.
    pub fn with_defaults() -> Self {
        log::debug!("🏭 Creating ChromeBrowserFactory with auto-detect");
        Self::new(|| {
            create_chrome_options(None, true, (1920, 1080))
                .map_err(|e| ExportError::Configuration(e.to_string()))
        })
    }

    /// Headless Chrome at a custom binary path.
    pub fn with_path(chrome_path: String) -> Self {
        log::debug!("🏭 Creating ChromeBrowserFactory with custom path: {}", chrome_path);
        Self::new(move || {
            create_chrome_options(Some(&chrome_path), true, (1920, 1080))
                .map_err(|e| ExportError::Configuration(e.to_string()))
        })
    }

    /// Chrome launched the way an [`ExportConfig`] asks for: binary path,
    /// headless or visible, window size.
    pub fn from_config(config: &ExportConfig) -> Self {
        let chrome_path = config.chrome_path.clone();
        let headless = config.headless;
        let window_size = config.window_size;
        log::debug!(
            "🏭 Creating ChromeBrowserFactory (path={}, headless={}, window={}x{})",
            chrome_path.as_deref().unwrap_or("auto-detect"),
            headless,
            window_size.0,
            window_size.1
        );
        Self::new(move || {
            create_chrome_options(chrome_path.as_deref(), headless, window_size)
                .map_err(|e| ExportError::Configuration(e.to_string()))
        })
    }
}

impl BrowserFactory for ChromeBrowserFactory {
    /// Create a new Chrome browser instance.
    ///
    /// # Errors
    ///
    /// * [`ExportError::Configuration`] if launch options generation fails.
    /// * [`ExportError::BrowserCreation`] if Chrome fails to launch.
    fn create(&self) -> Result<Browser> {
        let options = (self.launch_options_fn)()?;

        log::debug!("🚀 Launching Chrome browser...");
        Browser::new(options).map_err(|e| {
            log::error!("❌ Chrome launch failed: {}", e);
            ExportError::BrowserCreation(e.to_string())
        })
    }
}

/// Create Chrome launch options for capturing pages.
///
/// # Parameters
///
/// * `chrome_path` - Optional custom Chrome binary path. If None, auto-detects.
/// * `headless` - Run without a window.
/// * `window_size` - Window size in CSS pixels; the capture target is laid
///   out at this width.
///
/// # Chrome Flags Applied
///
/// - `--disable-dev-shm-usage` - Use /tmp instead of /dev/shm (container-friendly)
/// - `--hide-scrollbars` - Keep scrollbars out of the capture
/// - `--disable-extensions`, `--disable-sync`, `--disable-default-apps`
/// - `--disable-background-timer-throttling`, `--disable-renderer-backgrounding`,
///   `--disable-backgrounding-occluded-windows` - keep timers running while
///   a visible window sits behind others
/// - `--disable-popup-blocking`
pub fn create_chrome_options(
    chrome_path: Option<&str>,
    headless: bool,
    window_size: (u32, u32),
) -> std::result::Result<LaunchOptions<'static>, Box<dyn std::error::Error + Send + Sync>> {
    let mut builder = LaunchOptions::default_builder();

    if let Some(path) = chrome_path {
        builder.path(Some(path.to_string().into()));
        log::trace!("🔧 Chrome path set to: {}", path);
    } else {
        log::trace!("🔧 Chrome path: auto-detect");
    }

    let args: Vec<&'static OsStr> = vec![
        "--disable-dev-shm-usage".as_ref(),
        "--disable-crash-reporter".as_ref(),
        "--hide-scrollbars".as_ref(),
        "--disable-extensions".as_ref(),
        "--disable-sync".as_ref(),
        "--disable-default-apps".as_ref(),
        "--disable-background-timer-throttling".as_ref(),
        "--disable-backgrounding-occluded-windows".as_ref(),
        "--disable-renderer-backgrounding".as_ref(),
        "--disable-popup-blocking".as_ref(),
    ];

    builder
        .headless(headless)
        .sandbox(false)
        .window_size(Some(window_size))
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .args(args)
        .build()
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
            let path_msg = chrome_path.unwrap_or("auto-detect");
            log::error!("❌ Failed to build Chrome launch options (path: {}): {}", path_msg, e);
            e.into()
        })
}

// ============================================================================
// Unit Tests
// ============================================================================
