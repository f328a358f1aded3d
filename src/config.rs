//! Configuration for page capture and export.
//!
//! This module provides [`ExportConfig`] and [`ExportConfigBuilder`] for the
//! parts of an export that depend on the page being captured: where the
//! trigger and capture target live, which page-side libraries to load, how
//! long to wait for readiness and where to put the result.
//!
//! Paper size, orientation, magnification and top padding are not part of
//! the configuration. They are fixed in [`geometry`](crate::geometry).
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use region2pdf::ExportConfigBuilder;
//!
//! let config = ExportConfigBuilder::new()
//!     .target_selector("#report")
//!     .ready_timeout(Duration::from_secs(20))
//!     .build()
//!     .expect("Invalid configuration");
//!
//! assert_eq!(config.target_selector, "#report");
//! assert_eq!(config.filename, "file2.pdf");
//! ```
//!
//! # Environment Configuration
//!
//! When the `env-config` feature is enabled, configuration can be loaded
//! from environment variables and an optional `app.env` file. See [`mod@env`].

use std::path::PathBuf;
use std::time::Duration;

use crate::loader::Library;

/// Default CSS selector of the element whose clicks request an export.
pub const DEFAULT_TRIGGER_SELECTOR: &str = "#run";

/// Default CSS selector of the element that is captured.
pub const DEFAULT_TARGET_SELECTOR: &str = "#mainContainer";

/// Default output file name.
pub const DEFAULT_FILENAME: &str = "file2.pdf";

/// Export configuration.
///
/// # Fields Overview
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `trigger_selector` | `#run` | Element clicked to request an export |
/// | `target_selector` | `#mainContainer` | Element that is captured |
/// | `output_dir` | `.` | Directory the PDF is written to |
/// | `filename` | `file2.pdf` | Output file name |
/// | `libraries` | none | Page-side scripts loaded before capture |
/// | `headless` | `true` | Run Chrome without a window |
/// | `window_size` | 1920x1080 | Browser window size |
/// | `ready_timeout` | 30s | Max wait for trigger/target to appear |
/// | `settle_wait` | 2s | Max wait for `window.isPageDone` |
/// | `open_after_save` | `false` | Open the PDF in the system viewer |
/// | `chrome_path` | auto | Chrome binary |
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// CSS selector of the trigger element (listen mode).
    pub trigger_selector: String,

    /// CSS selector of the capture target.
    pub target_selector: String,

    /// Directory the PDF is saved into.
    pub output_dir: PathBuf,

    /// File name of the saved PDF.
    pub filename: String,

    /// Page-side libraries, loaded in order before every capture.
    ///
    /// Each library is injected at most once per page.
    pub libraries: Vec<Library>,

    /// Run the browser headless.
    ///
    /// Listen mode needs a visible window so someone can click the trigger.
    pub headless: bool,

    /// Browser window size in CSS pixels.
    pub window_size: (u32, u32),

    /// Maximum time to wait for the trigger and target elements.
    ///
    /// This bounded wait on the elements themselves is the readiness signal;
    /// there is no fixed startup delay.
    pub ready_timeout: Duration,

    /// Maximum time to poll for `window.isPageDone === true` once the target
    /// exists. Pages that never set the flag are captured after this delay.
    pub settle_wait: Duration,

    /// Open the saved file in the system PDF viewer.
    pub open_after_save: bool,

    /// Custom Chrome binary path. `None` lets `headless_chrome` find one.
    pub chrome_path: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            trigger_selector: DEFAULT_TRIGGER_SELECTOR.to_string(),
            target_selector: DEFAULT_TARGET_SELECTOR.to_string(),
            output_dir: PathBuf::from("."),
            filename: DEFAULT_FILENAME.to_string(),
            libraries: Vec::new(),
            headless: true,
            window_size: (1920, 1080),
            ready_timeout: Duration::from_secs(30),
            settle_wait: Duration::from_secs(2),
            open_after_save: false,
            chrome_path: None,
        }
    }
}

impl ExportConfig {
    /// Full path of the output file.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.filename)
    }
}

/// Builder for [`ExportConfig`] with validation.
///
/// # Validation
///
/// The [`build()`](Self::build) method validates:
/// - selectors are not empty
/// - filename is not empty and has no directory component
/// - `ready_timeout` is greater than zero
/// - window size is not zero in either direction
/// - library ids are unique
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: ExportConfig::default(),
        }
    }

    /// Set the trigger selector.
    pub fn trigger_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.trigger_selector = selector.into();
        self
    }

    /// Set the capture target selector.
    pub fn target_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.target_selector = selector.into();
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the output file name.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.config.filename = filename.into();
        self
    }

    /// Add a page-side library.
    pub fn library(mut self, library: Library) -> Self {
        self.config.libraries.push(library);
        self
    }

    /// Replace the page-side libraries.
    pub fn libraries(mut self, libraries: Vec<Library>) -> Self {
        self.config.libraries = libraries;
        self
    }

    /// Run headless or with a visible window.
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set the browser window size.
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width, height);
        self
    }

    /// Set the readiness timeout.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.config.ready_timeout = timeout;
        self
    }

    /// Set how long to poll for `window.isPageDone`.
    pub fn settle_wait(mut self, wait: Duration) -> Self {
        self.config.settle_wait = wait;
        self
    }

    /// Open the PDF after saving it.
    pub fn open_after_save(mut self, open: bool) -> Self {
        self.config.open_after_save = open;
        self
    }

    /// Set a custom Chrome binary path.
    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.config.chrome_path = path;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    ///
    /// ```rust
    /// use region2pdf::ExportConfigBuilder;
    ///
    /// assert!(ExportConfigBuilder::new().build().is_ok());
    /// assert!(ExportConfigBuilder::new().target_selector("  ").build().is_err());
    /// assert!(ExportConfigBuilder::new().filename("out/../x.pdf").build().is_err());
    /// ```
    pub fn build(self) -> std::result::Result<ExportConfig, String> {
        let config = self.config;

        if config.target_selector.trim().is_empty() {
            return Err("target selector must not be empty".to_string());
        }

        if config.trigger_selector.trim().is_empty() {
            return Err("trigger selector must not be empty".to_string());
        }

        if config.filename.trim().is_empty() {
            return Err("filename must not be empty".to_string());
        }

        if config.filename.contains(['/', '\\']) {
            return Err("filename must not contain a directory".to_string());
        }

        if config.ready_timeout.is_zero() {
            return Err("ready_timeout must be greater than 0".to_string());
        }

        if config.window_size.0 == 0 || config.window_size.1 == 0 {
            return Err("window size must be greater than 0".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for library in &config.libraries {
            if !seen.insert(library.id.as_str()) {
                return Err(format!("library '{}' is listed twice", library.id));
            }
        }

        Ok(config)
    }
}

impl Default for ExportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment Configuration (feature-gated)
// ============================================================================

/// Environment-based configuration loading.
///
/// Uses `dotenvy` to load an optional `app.env` file from the current
/// directory before reading the variables below.
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `REGION2PDF_TRIGGER` | String | `#run` | Trigger selector |
/// | `REGION2PDF_TARGET` | String | `#mainContainer` | Capture target selector |
/// | `REGION2PDF_OUTPUT_DIR` | path | `.` | Output directory |
/// | `REGION2PDF_FILENAME` | String | `file2.pdf` | Output file name |
/// | `REGION2PDF_LIBRARIES` | `id=url,...` | none | Page-side libraries |
/// | `REGION2PDF_READY_TIMEOUT_SECONDS` | u64 | 30 | Readiness timeout |
/// | `REGION2PDF_SETTLE_WAIT_MS` | u64 | 2000 | `isPageDone` poll window |
/// | `REGION2PDF_HEADLESS` | bool | true | Headless browser |
/// | `REGION2PDF_OPEN` | bool | false | Open after save |
/// | `CHROME_PATH` | String | auto | Chrome binary |
///
/// # Example `app.env` File
///
/// ```text
/// REGION2PDF_TARGET=#mainContainer
/// REGION2PDF_LIBRARIES=rasterizer=http://127.0.0.1:8050/assets/raster.js
/// REGION2PDF_READY_TIMEOUT_SECONDS=30
/// # CHROME_PATH=/usr/bin/chromium
/// ```
#[cfg(feature = "env-config")]
pub mod env {
    use super::*;
    use crate::error::ExportError;

    /// Default environment file name.
    pub const ENV_FILE_NAME: &str = "app.env";

    /// Load environment variables from `app.env`.
    pub fn load_env_file() -> Result<std::path::PathBuf, dotenvy::Error> {
        dotenvy::from_filename(ENV_FILE_NAME)
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Configuration`] if a library entry is malformed
    /// or the resulting configuration is invalid.
    pub fn from_env() -> Result<ExportConfig, ExportError> {
        match load_env_file() {
            Ok(path) => log::info!("📁 Loaded configuration from: {:?}", path),
            Err(e) => log::debug!(
                "📁 No {} file found or failed to load: {} (using environment variables and defaults)",
                ENV_FILE_NAME,
                e
            ),
        }

        builder_from_env()?
            .build()
            .map_err(ExportError::Configuration)
    }

    /// Builder pre-filled from the environment, for callers that layer more
    /// settings (e.g. command-line flags) on top.
    pub fn builder_from_env() -> Result<ExportConfigBuilder, ExportError> {
        let defaults = ExportConfig::default();
        let mut builder = ExportConfigBuilder::new();

        if let Some(trigger) = var("REGION2PDF_TRIGGER") {
            builder = builder.trigger_selector(trigger);
        }
        if let Some(target) = var("REGION2PDF_TARGET") {
            builder = builder.target_selector(target);
        }
        if let Some(dir) = var("REGION2PDF_OUTPUT_DIR") {
            builder = builder.output_dir(dir);
        }
        if let Some(filename) = var("REGION2PDF_FILENAME") {
            builder = builder.filename(filename);
        }
        if let Some(list) = var("REGION2PDF_LIBRARIES") {
            let libraries = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(Library::parse)
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.libraries(libraries);
        }

        let ready_secs = parsed("REGION2PDF_READY_TIMEOUT_SECONDS")
            .unwrap_or(defaults.ready_timeout.as_secs());
        let settle_ms = parsed("REGION2PDF_SETTLE_WAIT_MS")
            .unwrap_or(defaults.settle_wait.as_millis() as u64);
        let headless = parsed("REGION2PDF_HEADLESS").unwrap_or(defaults.headless);
        let open = parsed("REGION2PDF_OPEN").unwrap_or(defaults.open_after_save);

        log::debug!(
            "Environment settings: ready_timeout={}s, settle_wait={}ms, headless={}, open={}",
            ready_secs,
            settle_ms,
            headless,
            open
        );

        Ok(builder
            .ready_timeout(Duration::from_secs(ready_secs))
            .settle_wait(Duration::from_millis(settle_ms))
            .headless(headless)
            .open_after_save(open)
            .chrome_path(chrome_path_from_env()))
    }

    /// Get Chrome path from the `CHROME_PATH` environment variable.
    pub fn chrome_path_from_env() -> Option<String> {
        var("CHROME_PATH")
    }

    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
        var(name).and_then(|v| v.trim().parse().ok())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
