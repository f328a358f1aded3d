//! Listen mode: one export per trigger click, never overlapping.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use region2pdf::capture::mock::{MockSession, MockSessionProvider};
use region2pdf::prelude::*;

fn config(dir: &Path) -> ExportConfig {
    ExportConfigBuilder::new()
        .output_dir(dir)
        .library(Library::new("pdf", "http://127.0.0.1:8050/pdf.js"))
        .settle_wait(Duration::from_millis(20))
        .build()
        .unwrap()
}

fn source() -> PageSource {
    PageSource::url("http://127.0.0.1:8050").unwrap()
}

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < Duration::from_secs(10), "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_listen_exports_once_per_click() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0).with_queued_clicks(2);
    let exporter = Exporter::new(config(dir.path()), Box::new(MockSessionProvider::new(page)));

    let summary = exporter.listen(&source(), Some(2)).unwrap();

    assert_eq!(summary.reports.len(), 2);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.handled(), 2);
}

/// Clicks made while an export runs are served afterwards.
#[test]
fn test_clicks_during_export_are_queued() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0)
        .with_queued_clicks(1)
        .with_clicks_per_capture(1);
    let exporter = Exporter::new(config(dir.path()), Box::new(MockSessionProvider::new(MockSession::new())));

    let summary = exporter.listen_session(&page, Some(3)).unwrap();

    assert_eq!(summary.reports.len(), 3);
    let state = page.state();
    assert_eq!(state.captures, 3);
    assert_eq!(state.load_calls, 1, "library is loaded once for the page");
}

#[test]
fn test_listen_requires_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0).without_element("#run");
    let exporter = Exporter::new(config(dir.path()), Box::new(MockSessionProvider::new(page)));

    let err = exporter.listen(&source(), Some(1)).unwrap_err();
    assert!(matches!(err, ExportError::TriggerNotFound(ref s) if s == "#run"));
}

/// A failed export is recorded and the loop keeps serving clicks.
#[test]
fn test_failed_export_does_not_stop_listening() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0)
        .with_queued_clicks(2)
        .with_failing_script("http://127.0.0.1:8050/pdf.js");
    let exporter = Exporter::new(config(dir.path()), Box::new(MockSessionProvider::new(page)));

    let summary = exporter.listen(&source(), Some(2)).unwrap();

    assert!(summary.reports.is_empty());
    assert_eq!(summary.failures.len(), 2);
}

/// After a reload the listener is re-attached and libraries are loaded
/// again into the new document.
#[test]
fn test_listener_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let page = MockSession::dashboard(200.0, 100.0);
    let exporter = Arc::new(Exporter::new(
        config(dir.path()),
        Box::new(MockSessionProvider::new(MockSession::new())),
    ));

    let worker_page = page.clone();
    let worker_exporter = Arc::clone(&exporter);
    let worker = thread::spawn(move || worker_exporter.listen_session(&worker_page, Some(2)));

    wait_until("listener", || page.state().listener_attached);
    page.click();
    wait_until("first capture", || page.state().captures == 1);

    page.reload();
    wait_until("listener after reload", || page.state().listener_attached);
    page.click();

    let summary = worker.join().unwrap().unwrap();
    assert_eq!(summary.reports.len(), 2);

    let state = page.state();
    assert_eq!(state.load_calls, 2);
    assert_eq!(state.script_tags.len(), 1);
}
