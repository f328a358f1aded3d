//! The export trigger: capture the target region and deliver a paginated PDF.
//!
//! # Flow
//!
//! ```text
//! Exporter::export(source)
//!     │
//!     ├─ SessionProvider::open()     launch browser once, new tab, navigate
//!     ├─ wait_until_ready()          target present, window.isPageDone polled
//!     ├─ export_session()
//!     │     ├─ LibraryLoader::ensure_all()   awaited, at most once per page
//!     │     ├─ rasterize()                   target at 3x
//!     │     ├─ compose_pdf()                 A4 landscape slices
//!     │     └─ save_pdf() / open_pdf()
//!     └─ close tab
//! ```
//!
//! [`Exporter::listen`] keeps the tab open instead and runs `export_session`
//! once per click on the trigger element, one export at a time.
//!
//! # Async Usage
//!
//! Every step blocks on the browser. From async code use
//! [`export_with_timeout`], which moves the work to tokio's blocking pool and
//! bounds it with [`DEFAULT_TIMEOUT_SECS`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use region2pdf::{ExportConfig, Exporter, PageSource};
//! use region2pdf::export::{export_with_timeout, DEFAULT_TIMEOUT_SECS};
//!
//! let exporter = Arc::new(Exporter::with_chrome(ExportConfig::default()));
//! let source = PageSource::url("http://127.0.0.1:8050")?;
//! let report = export_with_timeout(exporter, source, DEFAULT_TIMEOUT_SECS).await?;
//! println!("{} page(s) written to {}", report.page_count, report.path.display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::{ChromeSessions, PageSession, SessionProvider, rasterize};
use crate::config::ExportConfig;
use crate::document::{ExportedPdf, compose_pdf};
use crate::error::{ExportError, Result};
use crate::factory::ChromeBrowserFactory;
use crate::geometry::{CAPTURE_SCALE, PageGeometry, TOP_PADDING_MM};
use crate::loader::LibraryLoader;
use crate::output::{open_pdf, save_pdf};
use crate::source::PageSource;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a whole export, in seconds.
///
/// Covers browser launch, navigation, readiness, library loading, capture
/// and saving. Tall targets at 3x can take several seconds to encode.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Polling interval for `window.isPageDone`.
const JS_POLL_INTERVAL_MS: u64 = 200;

/// Polling interval for trigger clicks in listen mode.
const CLICK_POLL_INTERVAL_MS: u64 = 250;

// ============================================================================
// Reports
// ============================================================================

/// Outcome of one successful export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Where the PDF was written.
    pub path: PathBuf,
    /// Number of pages in the document.
    pub page_count: usize,
    /// Document size in bytes.
    pub bytes: usize,
    /// Whether the PDF was handed to the system viewer.
    pub opened: bool,
    /// Time spent, from library loading to saving.
    pub elapsed: Duration,
}

/// Outcome of a listen run.
#[derive(Debug, Default)]
pub struct ListenSummary {
    /// Successful exports, in order.
    pub reports: Vec<ExportReport>,
    /// Exports that failed, with the error message.
    pub failures: Vec<String>,
}

impl ListenSummary {
    /// Number of clicks served, successful or not.
    pub fn handled(&self) -> usize {
        self.reports.len() + self.failures.len()
    }
}

// ============================================================================
// Exporter
// ============================================================================

/// Captures the configured target region and exports it as a PDF.
///
/// Holds the page-side library guard, so exports through the same
/// `Exporter` never inject a library twice into the same page.
pub struct Exporter {
    config: ExportConfig,
    sessions: Box<dyn SessionProvider>,
    loader: LibraryLoader,
}

impl Exporter {
    /// Create an exporter over any session provider.
    pub fn new(config: ExportConfig, sessions: Box<dyn SessionProvider>) -> Self {
        Self {
            config,
            sessions,
            loader: LibraryLoader::new(),
        }
    }

    /// Create an exporter backed by Chrome, launched as the config says.
    ///
    /// The browser starts on the first export.
    pub fn with_chrome(config: ExportConfig) -> Self {
        let factory = ChromeBrowserFactory::from_config(&config);
        let sessions = ChromeSessions::new(Box::new(factory), config.window_size);
        Self::new(config, Box::new(sessions))
    }

    /// Active configuration.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Library load guard.
    pub fn loader(&self) -> &LibraryLoader {
        &self.loader
    }

    /// Wait until the page can be exported.
    ///
    /// Waits up to `ready_timeout` for the trigger (only if `require_trigger`)
    /// and for the capture target, then polls `window.isPageDone` for up to
    /// `settle_wait`. A page that never sets the flag is exported anyway.
    ///
    /// # Errors
    ///
    /// - [`ExportError::TriggerNotFound`] if the trigger is required and missing
    /// - [`ExportError::TargetNotFound`] if the capture target is missing
    pub fn wait_until_ready(&self, session: &dyn PageSession, require_trigger: bool) -> Result<()> {
        let timeout = self.config.ready_timeout;

        if require_trigger {
            let selector = &self.config.trigger_selector;
            if !session.wait_for_selector(selector, timeout)? {
                log::error!("❌ Trigger '{}' not found after {:?}", selector, timeout);
                return Err(ExportError::TriggerNotFound(selector.clone()));
            }
        }

        let selector = &self.config.target_selector;
        if !session.wait_for_selector(selector, timeout)? {
            log::error!("❌ Capture target '{}' not found after {:?}", selector, timeout);
            return Err(ExportError::TargetNotFound(selector.clone()));
        }

        wait_for_page_done(session, self.config.settle_wait);
        Ok(())
    }

    /// Load libraries, capture the target and compose the PDF, in memory.
    pub fn render(&self, session: &dyn PageSession) -> Result<ExportedPdf> {
        let loaded = self.loader.ensure_all(session, &self.config.libraries)?;
        if loaded > 0 {
            log::debug!("Loaded {} library script(s) into {}", loaded, session.host_id());
        }

        let raster = rasterize(session, &self.config.target_selector, CAPTURE_SCALE)?;

        compose_pdf(
            &raster,
            PageGeometry::A4_LANDSCAPE,
            TOP_PADDING_MM,
            &document_title(&self.config.filename),
            &self.config.filename,
        )
    }

    /// Export the current content of an already ready page.
    ///
    /// Saves the PDF into the output directory and opens it if configured.
    /// Calling this again on the same page re-captures the current content
    /// and reuses the libraries already loaded.
    pub fn export_session(&self, session: &dyn PageSession) -> Result<ExportReport> {
        let start = Instant::now();

        let pdf = self.render(session)?;
        let path = save_pdf(&pdf, &self.config.output_dir)?;
        let opened = self.config.open_after_save && open_pdf(&path);

        let report = ExportReport {
            path,
            page_count: pdf.page_count(),
            bytes: pdf.size(),
            opened,
            elapsed: start.elapsed(),
        };

        log::info!(
            "✅ Exported {} page(s) ({} bytes) to {} in {:?}",
            report.page_count,
            report.bytes,
            report.path.display(),
            report.elapsed
        );

        Ok(report)
    }

    /// One-shot export: open the page, wait for it, export it, close it.
    ///
    /// The trigger element is not needed in this mode.
    pub fn export(&self, source: &PageSource) -> Result<ExportReport> {
        log::info!("📄 Exporting {}", source.describe());

        let session = self.sessions.open(source)?;
        let result = self
            .wait_until_ready(session.as_ref(), false)
            .and_then(|()| self.export_session(session.as_ref()));

        self.release(session.as_ref());
        result
    }

    /// Open the page and export once per click on the trigger element.
    ///
    /// Clicks that arrive while an export runs are counted and served after
    /// it, one at a time. A failed export is logged and recorded in the
    /// summary without ending the loop. When the page reloads, readiness is
    /// awaited again and the listener re-attached.
    ///
    /// Returns after `max_exports` clicks were served; with `None` it runs
    /// until the page becomes unreachable.
    ///
    /// # Errors
    ///
    /// Readiness errors, and errors talking to the page.
    pub fn listen(&self, source: &PageSource, max_exports: Option<usize>) -> Result<ListenSummary> {
        let session = self.sessions.open(source)?;
        let result = self.listen_session(session.as_ref(), max_exports);
        self.release(session.as_ref());
        result
    }

    /// Listen loop over an already open page. See [`listen`](Self::listen).
    pub fn listen_session(
        &self,
        session: &dyn PageSession,
        max_exports: Option<usize>,
    ) -> Result<ListenSummary> {
        self.arm(session)?;
        log::info!(
            "👂 Listening for clicks on '{}' (exports: {})",
            self.config.trigger_selector,
            max_exports.map_or_else(|| "unlimited".to_string(), |n| n.to_string())
        );

        let poll_interval = Duration::from_millis(CLICK_POLL_INTERVAL_MS);
        let mut summary = ListenSummary::default();
        let has_budget = |summary: &ListenSummary| max_exports.is_none_or(|max| summary.handled() < max);

        while has_budget(&summary) {
            match session.take_clicks()? {
                None => {
                    log::info!("🔄 Page was reloaded, re-attaching trigger listener");
                    self.loader.forget_host(&session.host_id());
                    self.arm(session)?;
                }
                Some(0) => std::thread::sleep(poll_interval),
                Some(clicks) => {
                    log::debug!("Trigger clicked {} time(s)", clicks);
                    for _ in 0..clicks {
                        if !has_budget(&summary) {
                            break;
                        }
                        match self.export_session(session) {
                            Ok(report) => summary.reports.push(report),
                            Err(e) => {
                                log::error!("❌ Export failed: {}", e);
                                summary.failures.push(e.to_string());
                            }
                        }
                    }
                }
            }
        }

        log::info!(
            "Listen finished: {} export(s), {} failure(s)",
            summary.reports.len(),
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Wait for trigger and target, then install the click listener.
    fn arm(&self, session: &dyn PageSession) -> Result<()> {
        self.wait_until_ready(session, true)?;

        let selector = &self.config.trigger_selector;
        if !session.attach_click_listener(selector)? {
            log::error!("❌ Trigger '{}' disappeared before the listener was attached", selector);
            return Err(ExportError::TriggerNotFound(selector.clone()));
        }
        Ok(())
    }

    fn release(&self, session: &dyn PageSession) {
        self.loader.forget_host(&session.host_id());
        session.close();
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("config", &self.config)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

/// Create a Chrome-backed exporter from environment variables.
///
/// Loads `app.env` if present, then reads the `REGION2PDF_*` variables (see
/// [`config::env`](crate::config::env)).
///
/// ```rust,no_run
/// use region2pdf::init_exporter;
///
/// let exporter = init_exporter()?;
/// # Ok::<(), region2pdf::ExportError>(())
/// ```
#[cfg(feature = "env-config")]
pub fn init_exporter() -> Result<Arc<Exporter>> {
    let config = crate::config::env::from_env()?;
    log::info!(
        "🚀 Exporter ready (target='{}', output={})",
        config.target_selector,
        config.output_path().display()
    );
    Ok(Arc::new(Exporter::with_chrome(config)))
}

// ============================================================================
// Async Wrappers
// ============================================================================

/// Run [`Exporter::export`] on tokio's blocking thread pool.
///
/// # Errors
///
/// Any export error, or [`ExportError::Capture`] if the worker panicked.
pub async fn export_async(exporter: Arc<Exporter>, source: PageSource) -> Result<ExportReport> {
    tokio::task::spawn_blocking(move || exporter.export(&source))
        .await
        .map_err(|e| {
            log::error!("❌ Export task failed: {}", e);
            ExportError::Capture(format!("export task failed: {}", e))
        })?
}

/// Run [`export_async`] bounded by `timeout_secs`.
///
/// # Errors
///
/// [`ExportError::Timeout`] if the export does not finish in time. The
/// blocking work is not cancelled; its tab is closed when it completes.
pub async fn export_with_timeout(
    exporter: Arc<Exporter>,
    source: PageSource,
    timeout_secs: u64,
) -> Result<ExportReport> {
    export_with_deadline(exporter, source, Duration::from_secs(timeout_secs)).await
}

/// Like [`export_with_timeout`] with a sub-second resolution deadline.
pub async fn export_with_deadline(
    exporter: Arc<Exporter>,
    source: PageSource,
    deadline: Duration,
) -> Result<ExportReport> {
    tokio::time::timeout(deadline, export_async(exporter, source))
        .await
        .map_err(|_| {
            log::error!("❌ Export timed out after {:?}", deadline);
            ExportError::Timeout(deadline.as_secs())
        })?
}

// ============================================================================
// Helpers
// ============================================================================

/// Poll `window.isPageDone` until it is true or `max_wait` elapsed.
///
/// Evaluation errors count as "not done yet".
fn wait_for_page_done(session: &dyn PageSession, max_wait: Duration) {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(JS_POLL_INTERVAL_MS);

    log::trace!("Waiting up to {:?} for window.isPageDone", max_wait);

    while start.elapsed() < max_wait {
        if session.page_done().unwrap_or(false) {
            log::debug!("Page signaled ready after {:?}", start.elapsed());
            return;
        }
        std::thread::sleep(poll_interval);
    }

    log::debug!(
        "Page wait completed after {:?} (no isPageDone signal, proceeding anyway)",
        start.elapsed()
    );
}

/// PDF title derived from the output file name.
fn document_title(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(filename)
        .to_string()
}

// ============================================================================
// Unit Tests
// ============================================================================
