//! Error types for region capture and PDF export.
//!
//! This module provides [`ExportError`], a unified error type for every step
//! of an export (browser launch, navigation, readiness, library loading,
//! rasterization, PDF composition, saving), and a convenient [`Result`] alias.
//!
//! # Example
//!
//! ```rust
//! use region2pdf::{ExportError, Result};
//!
//! fn export_report() -> Result<Vec<u8>> {
//!     Err(ExportError::TargetNotFound("#mainContainer".to_string()))
//! }
//!
//! match export_report() {
//!     Ok(pdf) => println!("Exported {} bytes", pdf.len()),
//!     Err(ExportError::TargetNotFound(selector)) => println!("Nothing to capture at {}", selector),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

/// Errors that can occur while capturing a page region and exporting it.
///
/// Only the readiness failures ([`TriggerNotFound`](Self::TriggerNotFound) and
/// [`TargetNotFound`](Self::TargetNotFound)) have a dedicated handling path in
/// the exporter: they are logged where they are detected. Every other variant
/// is propagated to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Invalid configuration provided.
    ///
    /// # Common Causes
    ///
    /// - Empty trigger or capture target selector
    /// - Empty output filename
    /// - Zero readiness timeout
    /// - Malformed `--library id=url` argument
    ///
    /// # Example
    ///
    /// ```rust
    /// use region2pdf::ExportError;
    ///
    /// let error = ExportError::Configuration("target selector must not be empty".to_string());
    /// assert_eq!(error.to_string(), "Configuration error: target selector must not be empty");
    /// ```
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The page source is not a usable URL or HTML document.
    #[error("Invalid page source: {0}")]
    InvalidSource(String),

    /// Failed to launch the browser used for rasterization.
    ///
    /// Typically a missing Chrome/Chromium binary or a bad launch flag.
    #[error("Failed to create browser: {0}")]
    BrowserCreation(String),

    /// Failed to open a tab in the browser.
    #[error("Failed to open tab: {0}")]
    TabCreation(String),

    /// Navigation to the page failed or did not complete.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The trigger element never appeared on the page.
    ///
    /// Only relevant in listen mode, where the click listener is attached to it.
    #[error("Trigger element not found: {0}")]
    TriggerNotFound(String),

    /// The capture target element never appeared on the page.
    #[error("Capture target not found: {0}")]
    TargetNotFound(String),

    /// A page-side library could not be injected or failed to load.
    #[error("Failed to load library '{id}': {reason}")]
    LibraryLoad {
        /// Library identity.
        id: String,
        /// Why loading failed.
        reason: String,
    },

    /// Evaluating JavaScript in the page failed.
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// The screenshot of the capture target could not be taken.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The capture target rendered to an empty bitmap.
    ///
    /// Raised for zero width or zero height, which would make the page-width
    /// scaling undefined.
    #[error("Captured region is empty ({width}x{height} px)")]
    EmptyCapture {
        /// Bitmap width in pixels.
        width: u32,
        /// Bitmap height in pixels.
        height: u32,
    },

    /// The captured bytes are not a decodable image.
    #[error("Failed to decode captured image: {0}")]
    ImageDecode(String),

    /// The PDF document could not be produced.
    #[error("PDF generation failed: {0}")]
    PdfGeneration(String),

    /// Writing the output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The export did not finish in time.
    #[error("Export timed out after {0} seconds")]
    Timeout(u64),
}

impl ExportError {
    /// Whether the error comes from the page not being ready (missing trigger
    /// or capture target) rather than from a broken environment.
    ///
    /// ```rust
    /// use region2pdf::ExportError;
    ///
    /// assert!(ExportError::TriggerNotFound("#run".into()).is_readiness());
    /// assert!(!ExportError::Timeout(60).is_readiness());
    /// ```
    pub fn is_readiness(&self) -> bool {
        matches!(
            self,
            ExportError::TriggerNotFound(_) | ExportError::TargetNotFound(_)
        )
    }
}

/// Convenience conversion from [`String`] to [`ExportError::Configuration`].
///
/// Lets builder validation errors (`Result<_, String>`) flow through `?`.
impl From<String> for ExportError {
    fn from(msg: String) -> Self {
        ExportError::Configuration(msg)
    }
}

/// Convenience conversion from `&str` to [`ExportError::Configuration`].
impl From<&str> for ExportError {
    fn from(msg: &str) -> Self {
        ExportError::Configuration(msg.to_string())
    }
}

/// Result type alias using [`ExportError`].
pub type Result<T> = std::result::Result<T, ExportError>;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies error type conversions from String and &str.
    #[test]
    fn test_error_conversion() {
        let error: ExportError = "test error".into();
        match error {
            ExportError::Configuration(msg) => {
                assert_eq!(msg, "test error", "Error message should be preserved");
            }
            _ => panic!("Expected Configuration error variant"),
        }

        let error: ExportError = "another error".to_string().into();
        assert!(matches!(error, ExportError::Configuration(ref m) if m == "another error"));
    }

    /// Verifies that error Display formatting works correctly.
    #[test]
    fn test_error_display() {
        let error = ExportError::TargetNotFound("#mainContainer".to_string());
        assert_eq!(error.to_string(), "Capture target not found: #mainContainer");

        let error = ExportError::LibraryLoad {
            id: "rasterizer".to_string(),
            reason: "404".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to load library 'rasterizer': 404");

        let error = ExportError::EmptyCapture { width: 0, height: 12 };
        assert_eq!(error.to_string(), "Captured region is empty (0x12 px)");

        let error = ExportError::Timeout(60);
        assert_eq!(error.to_string(), "Export timed out after 60 seconds");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error: ExportError = io.into();
        assert!(matches!(error, ExportError::Io(_)));
        assert!(error.to_string().contains("read-only"));
    }

    #[test]
    fn test_readiness_classification() {
        assert!(ExportError::TargetNotFound("#x".into()).is_readiness());
        assert!(ExportError::TriggerNotFound("#run".into()).is_readiness());
        assert!(!ExportError::Capture("boom".into()).is_readiness());
        assert!(!ExportError::Configuration("bad".into()).is_readiness());
    }

    /// Verifies that ExportError is Send + Sync so it can cross spawn_blocking.
    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
        assert_send_sync::<ExportError>();
    }
}
