//! Presenting the exported document: saving it and opening it.

use std::path::{Path, PathBuf};

use crate::document::ExportedPdf;
use crate::error::{ExportError, Result};

/// Write `pdf` to `<dir>/<pdf.filename>`, creating `dir` if needed.
///
/// An existing file with the same name is overwritten.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the directory or file cannot be written.
pub fn save_pdf(pdf: &ExportedPdf, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        log::error!("❌ Cannot create output directory {}: {}", dir.display(), e);
        ExportError::Io(e)
    })?;

    let path = dir.join(&pdf.filename);
    std::fs::write(&path, &pdf.data).map_err(|e| {
        log::error!("❌ Cannot write {}: {}", path.display(), e);
        ExportError::Io(e)
    })?;

    log::debug!("💾 Saved {} bytes to {}", pdf.size(), path.display());
    Ok(path)
}

/// Open a saved PDF in the system viewer.
///
/// Failure only logs a warning: the file is already saved.
pub fn open_pdf(path: &Path) -> bool {
    match open::that(path) {
        Ok(()) => {
            log::debug!("Opened {} in the system viewer", path.display());
            true
        }
        Err(e) => {
            log::warn!("⚠️ Could not open {}: {}", path.display(), e);
            false
        }
    }
}

/// Reduce a user-supplied name to a bare `.pdf` file name.
///
/// Directory components are dropped and a `.pdf` extension is appended when
/// missing. Returns `None` if nothing usable is left.
///
/// ```rust
/// use region2pdf::output::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../reports/q3").as_deref(), Some("q3.pdf"));
/// assert_eq!(sanitize_filename("file2.PDF").as_deref(), Some("file2.PDF"));
/// assert_eq!(sanitize_filename("  "), None);
/// ```
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return None;
    }

    let has_pdf_extension = Path::new(base)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if has_pdf_extension {
        Some(base.to_string())
    } else {
        Some(format!("{}.pdf", base))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageGeometry;

    fn sample_pdf(filename: &str) -> ExportedPdf {
        ExportedPdf {
            data: b"%PDF-1.7\n%%EOF".to_vec(),
            filename: filename.to_string(),
            layout: PageGeometry::A4_LANDSCAPE.layout(300, 100),
        }
    }

    #[test]
    fn test_save_pdf_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out");

        let path = save_pdf(&sample_pdf("file2.pdf"), &target).unwrap();
        assert_eq!(path, target.join("file2.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7\n%%EOF");
    }

    #[test]
    fn test_save_pdf_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file2.pdf"), b"old").unwrap();

        let path = save_pdf(&sample_pdf("file2.pdf"), dir.path()).unwrap();
        assert!(std::fs::read(path).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn test_save_pdf_into_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = save_pdf(&sample_pdf("file2.pdf"), file.path());
        assert!(matches!(result, Err(ExportError::Io(_))));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("file2.pdf").as_deref(), Some("file2.pdf"));
        assert_eq!(sanitize_filename("report").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_filename("C:\\out\\report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_filename("dir/").as_deref(), None);
        assert_eq!(sanitize_filename(".."), None);
    }
}
