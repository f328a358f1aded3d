//! # region2pdf
//!
//! Capture a region of a web page as a high resolution bitmap and export it
//! as a multi-page A4 landscape PDF.
//!
//! The page is loaded in headless (or visible) Chrome. The element matching
//! the capture target selector (`#mainContainer` by default) is screenshotted
//! at 3 device pixels per CSS pixel, scaled to the page width and tiled
//! vertically across as many pages as its height needs.
//!
//! ## Features
//!
//! - **Explicit Readiness**: waits for the target element and the page's
//!   `window.isPageDone` signal instead of a fixed delay
//! - **Load-Once Dependencies**: page-side libraries are injected and awaited
//!   at most once per page; the browser is launched once and reused
//! - **Gapless Pagination**: every row of the captured bitmap lands on
//!   exactly one page
//! - **Listen Mode**: export once per click on a trigger element (`#run`),
//!   one export at a time
//! - **Async Friendly**: blocking work runs on tokio's blocking pool with a
//!   timeout
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        region2pdf CLI / your code           │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │                 Exporter                    │
//! │ ┌─────────────────────────────────────────┐ │
//! │ │   readiness: selectors + isPageDone     │ │
//! │ └─────────────────────────────────────────┘ │
//! │ ┌─────────────────────────────────────────┐ │
//! │ │   LibraryLoader (host, library id)      │ │
//! │ └─────────────────────────────────────────┘ │
//! │ ┌─────────────────────────────────────────┐ │
//! │ │   rasterize → paginate → compose_pdf    │ │
//! │ └─────────────────────────────────────────┘ │
//! └─────────────────┬───────────────────────────┘
//!                   │ SessionProvider
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │   ChromeSessions (browser launched once)    │
//! │     (managed by headless_chrome crate)      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use region2pdf::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = ExportConfigBuilder::new()
//!         .output_dir("exports")
//!         .build()?;
//!
//!     let exporter = Exporter::with_chrome(config);
//!     let report = exporter.export(&PageSource::url("http://127.0.0.1:8050")?)?;
//!
//!     println!("{} page(s) saved to {}", report.page_count, report.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Configuration
//!
//! When the `env-config` feature is enabled, an exporter can be created from
//! environment variables (loaded from an `app.env` file or the system
//! environment):
//!
//! ```rust,no_run
//! use region2pdf::init_exporter;
//!
//! let exporter = init_exporter()?;
//! # Ok::<(), region2pdf::ExportError>(())
//! ```
//!
//! ### Environment Variables
//!
//! | Variable | Type | Default | Description |
//! |----------|------|---------|-------------|
//! | `REGION2PDF_TRIGGER` | String | `#run` | Trigger selector |
//! | `REGION2PDF_TARGET` | String | `#mainContainer` | Capture target selector |
//! | `REGION2PDF_OUTPUT_DIR` | path | `.` | Output directory |
//! | `REGION2PDF_FILENAME` | String | `file2.pdf` | Output file name |
//! | `REGION2PDF_LIBRARIES` | `id=url,...` | none | Page-side libraries |
//! | `REGION2PDF_READY_TIMEOUT_SECONDS` | u64 | 30 | Readiness timeout |
//! | `REGION2PDF_SETTLE_WAIT_MS` | u64 | 2000 | `isPageDone` poll window |
//! | `REGION2PDF_HEADLESS` | bool | true | Headless browser |
//! | `REGION2PDF_OPEN` | bool | false | Open the PDF after saving |
//! | `CHROME_PATH` | String | auto | Custom Chrome binary path |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `env-config` | Environment-based configuration (default) |
//! | `test-utils` | Mock browser factory and mock page sessions |
//!
//! ## Testing
//!
//! With the `test-utils` feature, [`capture::mock::MockSession`] stands in for
//! a browser tab, so the whole export pipeline runs without Chrome:
//!
//! ```rust,ignore
//! use region2pdf::capture::mock::{MockSession, MockSessionProvider};
//! use region2pdf::{ExportConfig, Exporter, PageSource};
//!
//! let provider = MockSessionProvider::new(MockSession::dashboard(1000.0, 3000.0));
//! let exporter = Exporter::new(ExportConfig::default(), Box::new(provider));
//! let report = exporter.export(&PageSource::url("http://127.0.0.1:8050")?)?;
//! assert_eq!(report.page_count, 5);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Modules
// ============================================================================

pub mod capture;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod factory;
pub mod geometry;
pub mod loader;
pub mod output;
pub mod prelude;
pub mod raster;
pub mod source;

// ============================================================================
// Re-exports (Public API)
// ============================================================================

// Core types
pub use capture::{ElementRect, PageSession, SessionProvider, rasterize};
pub use config::{ExportConfig, ExportConfigBuilder};
pub use document::{ExportedPdf, compose_pdf};
pub use error::{ExportError, Result};
pub use export::{ExportReport, Exporter, ListenSummary};
pub use factory::{BrowserFactory, ChromeBrowserFactory, create_chrome_options};
pub use geometry::{PageGeometry, PageLayout, compute_page_offsets};
pub use loader::{Library, LibraryLoader, LoadedOnce, ScriptHost};
pub use raster::RasterImage;
pub use source::PageSource;

// Feature-gated re-exports
#[cfg(feature = "env-config")]
pub use config::env::{chrome_path_from_env, from_env};

#[cfg(feature = "env-config")]
pub use export::init_exporter;

// ============================================================================
// Convenience type aliases
// ============================================================================

/// Exporter shared between async tasks.
///
/// [`export::export_with_timeout`] takes this form.
pub type SharedExporter = std::sync::Arc<Exporter>;
