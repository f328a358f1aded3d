//! Browser factory implementations.
//!
//! The browser is the rasterization backend: it renders the page and takes
//! the screenshot of the capture target. Creating it is abstracted behind
//! [`BrowserFactory`] so the exporter can be driven by a mock in tests.
//!
//! # Available Factories
//!
//! | Factory | Description |
//! |---------|-------------|
//! | [`ChromeBrowserFactory`] | Creates Chrome/Chromium browsers |
//! | [`mock::MockBrowserFactory`] | For testing (feature-gated) |
//!
//! # Example
//!
//! ```rust,ignore
//! use region2pdf::{BrowserFactory, ChromeBrowserFactory};
//!
//! let factory = ChromeBrowserFactory::with_defaults();
//! let browser = factory.create()?;
//! ```

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::{ChromeBrowserFactory, create_chrome_options};

use crate::error::Result;
use headless_chrome::Browser;

/// Trait for browser factory pattern.
///
/// Requires `Send + Sync` because the exporter may be moved onto a blocking
/// worker thread.
pub trait BrowserFactory: Send + Sync {
    /// Create a new browser instance.
    ///
    /// # Errors
    ///
    /// - [`ExportError::Configuration`](crate::ExportError::Configuration) -
    ///   Invalid launch options
    /// - [`ExportError::BrowserCreation`](crate::ExportError::BrowserCreation) -
    ///   Binary not found, launch fails, etc.
    fn create(&self) -> Result<Browser>;
}
