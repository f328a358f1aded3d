//! Mock browser factory for testing.
//!
//! Lets tests exercise the browser launch path (including the load-once
//! retry after a failed launch) without Chrome installed.
//!
//! Only available with the `test-utils` feature or during `cargo test`.
//!
//! ```rust,ignore
//! use region2pdf::factory::mock::MockBrowserFactory;
//!
//! let factory = MockBrowserFactory::always_fails("Chrome not installed");
//! assert!(factory.create().is_err());
//! assert_eq!(factory.creation_count(), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use headless_chrome::Browser;

use super::BrowserFactory;
use super::chrome::create_chrome_options;
use crate::error::{ExportError, Result};

/// Mock browser factory.
///
/// Either always fails, fails after N attempts, or falls through to a real
/// headless Chrome launch. Every attempt is counted.
pub struct MockBrowserFactory {
    should_fail: bool,
    error_message: String,
    creation_count: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

impl MockBrowserFactory {
    /// Factory that attempts a real headless launch (needs Chrome).
    pub fn new() -> Self {
        Self {
            should_fail: false,
            error_message: String::new(),
            creation_count: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
        }
    }

    /// Factory whose every launch fails with `message`.
    pub fn always_fails<S: Into<String>>(message: S) -> Self {
        Self {
            should_fail: true,
            error_message: message.into(),
            creation_count: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
        }
    }

    /// Factory that fails once `n` launches have been attempted.
    pub fn fail_after_n<S: Into<String>>(n: usize, message: S) -> Self {
        Self {
            should_fail: false,
            error_message: message.into(),
            creation_count: Arc::new(AtomicUsize::new(0)),
            fail_after: Some(n),
        }
    }

    /// Number of launch attempts so far.
    pub fn creation_count(&self) -> usize {
        self.creation_count.load(Ordering::SeqCst)
    }

    /// Shared handle on the attempt counter, still readable after the
    /// factory was moved into an exporter.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.creation_count)
    }
}

impl Default for MockBrowserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserFactory for MockBrowserFactory {
    fn create(&self) -> Result<Browser> {
        let count = self.creation_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            log::debug!("MockBrowserFactory: Returning configured failure");
            return Err(ExportError::BrowserCreation(self.error_message.clone()));
        }

        if let Some(fail_after) = self.fail_after {
            if count >= fail_after {
                log::debug!("MockBrowserFactory: Failing after {} launches", fail_after);
                return Err(ExportError::BrowserCreation(self.error_message.clone()));
            }
        }

        log::debug!("MockBrowserFactory: Attempting real browser launch #{}", count + 1);
        let options = create_chrome_options(None, true, (1280, 720))
            .map_err(|e| ExportError::Configuration(e.to_string()))?;

        Browser::new(options).map_err(|e| ExportError::BrowserCreation(e.to_string()))
    }
}

impl std::fmt::Debug for MockBrowserFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBrowserFactory")
            .field("should_fail", &self.should_fail)
            .field("error_message", &self.error_message)
            .field("creation_count", &self.creation_count.load(Ordering::SeqCst))
            .field("fail_after", &self.fail_after)
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
