//! Convenient imports for common usage patterns.
//!
//! # Usage
//!
//! ```rust,ignore
//! use region2pdf::prelude::*;
//! ```
//!
//! This imports:
//!
//! - [`Exporter`] - Captures the target and writes the PDF
//! - [`ExportConfig`] / [`ExportConfigBuilder`] - Configuration
//! - [`ExportError`] / [`Result`] - Error handling
//! - [`ExportReport`] / [`ListenSummary`] - Export outcomes
//! - [`PageSource`] - URL or inline HTML to load
//! - [`Library`] - Page-side script dependency
//! - [`BrowserFactory`] / [`ChromeBrowserFactory`] - Browser launch
//! - [`SharedExporter`] - Type alias for async use
//!
//! # Example
//!
//! ```rust,ignore
//! use region2pdf::prelude::*;
//! use region2pdf::export::{export_with_timeout, DEFAULT_TIMEOUT_SECS};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let exporter: SharedExporter = Arc::new(Exporter::with_chrome(ExportConfig::default()));
//!     let source = PageSource::url("http://127.0.0.1:8050")?;
//!
//!     let report = export_with_timeout(exporter, source, DEFAULT_TIMEOUT_SECS).await?;
//!     println!("saved {}", report.path.display());
//!     Ok(())
//! }
//! ```

pub use crate::SharedExporter;
pub use crate::config::{ExportConfig, ExportConfigBuilder};
pub use crate::error::{ExportError, Result};
pub use crate::export::{ExportReport, Exporter, ListenSummary};
pub use crate::factory::{BrowserFactory, ChromeBrowserFactory};
pub use crate::loader::Library;
pub use crate::source::PageSource;

#[cfg(feature = "env-config")]
pub use crate::config::env::from_env;

#[cfg(feature = "env-config")]
pub use crate::export::init_exporter;

pub use std::sync::Arc;
