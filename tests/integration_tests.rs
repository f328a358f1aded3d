//! End-to-end export tests over mock page sessions.
//!
//! The mock pages return real PNG screenshots, so decoding, pagination and
//! PDF composition all run as in production.

use std::path::Path;
use std::time::Duration;

use region2pdf::capture::mock::{MockSession, MockSessionProvider};
use region2pdf::factory::mock::MockBrowserFactory;
use region2pdf::capture::ChromeSessions;
use region2pdf::prelude::*;
use region2pdf::{ElementRect, PageSession, SessionProvider};

fn config(dir: &Path) -> ExportConfigBuilder {
    ExportConfigBuilder::new()
        .output_dir(dir)
        .settle_wait(Duration::from_millis(20))
}

fn source() -> PageSource {
    PageSource::url("http://127.0.0.1:8050").unwrap()
}

/// A target whose captured bitmap fits one page yields one page.
#[test]
fn test_short_target_exports_single_page() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockSessionProvider::new(MockSession::dashboard(400.0, 100.0));
    let exporter = Exporter::new(config(dir.path()).build().unwrap(), Box::new(provider));

    let report = exporter.export(&source()).unwrap();

    assert_eq!(report.page_count, 1);
    assert_eq!(report.path, dir.path().join("file2.pdf"));
    let bytes = std::fs::read(&report.path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(bytes.len(), report.bytes);
}

/// Height/width ratio 3 gives a 891 mm image on 297 mm wide pages: 5 pages.
#[test]
fn test_tall_target_is_paginated() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockSessionProvider::new(MockSession::dashboard(100.0, 300.0));
    let exporter = Exporter::new(config(dir.path()).build().unwrap(), Box::new(provider));

    let report = exporter.export(&source()).unwrap();
    assert_eq!(report.page_count, 5);
}

/// Exporting twice in a row succeeds and each page gets each library once.
#[test]
fn test_repeated_exports_do_not_duplicate_libraries() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockSessionProvider::new(MockSession::new());
    let config = config(dir.path())
        .library(Library::new("rasterizer", "http://127.0.0.1:8050/raster.js"))
        .library(Library::new("pdf", "http://127.0.0.1:8050/pdf.js"))
        .build()
        .unwrap();
    let exporter = Exporter::new(config, Box::new(provider));

    let page = MockSession::dashboard(200.0, 100.0);
    exporter.wait_until_ready(&page, false).unwrap();
    let first = exporter.export_session(&page).unwrap();
    let second = exporter.export_session(&page).unwrap();

    assert_eq!(first.path, second.path);
    let state = page.state();
    assert_eq!(state.captures, 2);
    assert_eq!(state.load_calls, 2, "libraries must load once per page");
    assert_eq!(
        state.script_tags,
        vec![
            "http://127.0.0.1:8050/raster.js".to_string(),
            "http://127.0.0.1:8050/pdf.js".to_string()
        ]
    );
}

/// A library the page already ships is reused, not injected again.
#[test]
fn test_page_shipped_library_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let url = "http://127.0.0.1:8050/assets/pdf.js";
    let provider = MockSessionProvider::new(MockSession::new());
    let config = config(dir.path())
        .library(Library::new("pdf", url))
        .build()
        .unwrap();
    let exporter = Exporter::new(config, Box::new(provider));

    let page = MockSession::dashboard(200.0, 100.0).with_preloaded_script(url);
    exporter.wait_until_ready(&page, false).unwrap();
    exporter.export_session(&page).unwrap();
    exporter.export_session(&page).unwrap();

    let state = page.state();
    assert_eq!(state.load_calls, 1);
    assert_eq!(state.script_tags, vec![url.to_string()]);
    assert!(exporter.loader().is_loaded("mock-page", "pdf"));
}

/// Each one-shot export opens and closes its own page.
#[test]
fn test_one_shot_exports_close_their_pages() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockSessionProvider::new(MockSession::dashboard(200.0, 100.0));
    let exporter = Exporter::new(
        config(dir.path())
            .library(Library::new("pdf", "http://127.0.0.1:8050/pdf.js"))
            .build()
            .unwrap(),
        Box::new(provider),
    );

    exporter.export(&source()).unwrap();
    exporter.export(&source()).unwrap();

    assert!(!exporter.loader().is_loaded("mock-tab-1", "pdf"));
    assert!(!exporter.loader().is_loaded("mock-tab-2", "pdf"));
}

#[test]
fn test_missing_target_fails_export() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0).without_element("#mainContainer");
    let exporter = Exporter::new(
        config(dir.path()).build().unwrap(),
        Box::new(MockSessionProvider::new(page)),
    );

    let err = exporter.export(&source()).unwrap_err();
    assert!(matches!(err, ExportError::TargetNotFound(ref s) if s == "#mainContainer"));
    assert!(!dir.path().join("file2.pdf").exists());
}

/// One-shot exports do not need the trigger element.
#[test]
fn test_one_shot_export_without_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0).without_element("#run");
    let exporter = Exporter::new(
        config(dir.path()).build().unwrap(),
        Box::new(MockSessionProvider::new(page)),
    );

    assert!(exporter.export(&source()).is_ok());
}

#[test]
fn test_library_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0).with_failing_script("http://127.0.0.1:8050/pdf.js");
    let exporter = Exporter::new(
        config(dir.path())
            .library(Library::new("pdf", "http://127.0.0.1:8050/pdf.js"))
            .build()
            .unwrap(),
        Box::new(MockSessionProvider::new(page)),
    );

    match exporter.export(&source()) {
        Err(ExportError::LibraryLoad { id, .. }) => assert_eq!(id, "pdf"),
        other => panic!("Expected LibraryLoad error, got {:?}", other),
    }
}

#[test]
fn test_custom_selectors_and_filename() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::new()
        .with_element("#report", ElementRect::new(0.0, 0.0, 320.0, 240.0))
        .with_page_done(true);
    let exporter = Exporter::new(
        config(dir.path())
            .target_selector("#report")
            .filename("quarterly.pdf")
            .build()
            .unwrap(),
        Box::new(MockSessionProvider::new(page)),
    );

    let report = exporter.export(&source()).unwrap();
    assert_eq!(report.path, dir.path().join("quarterly.pdf"));
}

/// Inline HTML is navigated to through a data URL.
#[test]
fn test_html_source_navigates_data_url() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockSessionProvider::new(MockSession::dashboard(200.0, 100.0));
    let sessions_view = Arc::new(provider);
    let exporter = Exporter::new(
        config(dir.path()).build().unwrap(),
        Box::new(SharedProvider(Arc::clone(&sessions_view))),
    );

    let html = PageSource::html("<div id=\"mainContainer\">report</div>").unwrap();
    exporter.export(&html).unwrap();

    let opened = sessions_view.sessions();
    assert_eq!(opened.len(), 1);
    let state = opened[0].state();
    assert!(state.url.unwrap().starts_with("data:text/html;charset=utf-8,"));
    assert!(state.closed);
}

struct SharedProvider(Arc<MockSessionProvider>);

impl SessionProvider for SharedProvider {
    fn open(&self, source: &PageSource) -> Result<Box<dyn PageSession>> {
        self.0.open(source)
    }
}

/// Browser launch failures surface as BrowserCreation and are retried on
/// the next export.
#[test]
fn test_browser_launch_failure_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let factory = MockBrowserFactory::always_fails("Chrome not installed");
    let counter = factory.counter();
    let config = config(dir.path()).build().unwrap();
    let sessions = ChromeSessions::new(Box::new(factory), config.window_size);
    let exporter = Exporter::new(config, Box::new(sessions));

    for _ in 0..2 {
        match exporter.export(&source()) {
            Err(ExportError::BrowserCreation(msg)) => assert_eq!(msg, "Chrome not installed"),
            other => panic!("Expected BrowserCreation error, got {:?}", other),
        }
    }
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[test]
fn test_navigation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(
        config(dir.path()).build().unwrap(),
        Box::new(MockSessionProvider::failing("net::ERR_CONNECTION_REFUSED")),
    );

    assert!(matches!(
        exporter.export(&source()),
        Err(ExportError::Navigation(_))
    ));
}
