//! `region2pdf` command line.
//!
//! ```text
//! region2pdf http://127.0.0.1:8050                      # export once
//! region2pdf report.html --output-dir exports           # local HTML file
//! region2pdf http://127.0.0.1:8050 --listen             # export on every #run click
//! region2pdf http://127.0.0.1:8050 \
//!     --library rasterizer=http://127.0.0.1:8050/assets/raster.js
//! ```
//!
//! Settings not given as flags come from `REGION2PDF_*` environment
//! variables and `app.env`, then from the defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use region2pdf::export::{DEFAULT_TIMEOUT_SECS, export_with_timeout};
use region2pdf::output::sanitize_filename;
use region2pdf::{ExportConfig, ExportConfigBuilder, ExportError, Exporter, Library, PageSource, Result};

/// Capture a page region and export it as a paginated A4 landscape PDF
#[derive(Parser, Debug)]
#[command(name = "region2pdf", version, about)]
struct Args {
    /// Page to capture: a URL, or the path of an .html file
    page: String,

    /// Keep the page open and export once per click on the trigger element
    #[arg(long)]
    listen: bool,

    /// Stop listening after this many exports
    #[arg(long, requires = "listen")]
    max_exports: Option<usize>,

    /// Directory the PDF is written to
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Output file name
    #[arg(long, short)]
    filename: Option<String>,

    /// Page-side library to load before capture, as ID=URL (repeatable)
    #[arg(long = "library", value_name = "ID=URL")]
    libraries: Vec<String>,

    /// CSS selector of the region to capture
    #[arg(long)]
    target: Option<String>,

    /// CSS selector of the element whose clicks request an export
    #[arg(long)]
    trigger: Option<String>,

    /// Show the browser window (implied by --listen)
    #[arg(long)]
    headed: bool,

    /// Open the PDF in the system viewer after saving
    #[arg(long)]
    open: bool,

    /// Seconds to wait for the trigger and target elements
    #[arg(long, value_name = "SECONDS")]
    ready_timeout: Option<u64>,

    /// Browser window size as WxH (e.g., 1920x1080)
    #[arg(long, value_parser = parse_window_size)]
    window: Option<(u32, u32)>,

    /// Chrome or Chromium binary
    #[arg(long, value_name = "PATH")]
    chrome: Option<String>,

    /// Abort a one-shot export after this many seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let source = PageSource::from_arg(&args.page)?;
    let exporter = Arc::new(Exporter::with_chrome(config));

    if !args.listen {
        let report = export_with_timeout(exporter, source, args.timeout).await?;
        println!("{}", report.path.display());
        return Ok(());
    }

    let max_exports = args.max_exports;
    let summary = tokio::task::spawn_blocking(move || exporter.listen(&source, max_exports))
        .await
        .map_err(|e| ExportError::Capture(format!("listen task failed: {}", e)))??;

    for report in &summary.reports {
        println!("{}", report.path.display());
    }
    if !summary.failures.is_empty() {
        log::warn!("⚠️ {} export(s) failed", summary.failures.len());
    }
    Ok(())
}

/// Environment settings with command-line flags layered on top.
fn build_config(args: &Args) -> Result<ExportConfig> {
    let mut builder = base_builder()?;

    if let Some(trigger) = &args.trigger {
        builder = builder.trigger_selector(trigger.as_str());
    }
    if let Some(target) = &args.target {
        builder = builder.target_selector(target.as_str());
    }
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(name) = &args.filename {
        let name = sanitize_filename(name)
            .ok_or_else(|| ExportError::Configuration(format!("invalid file name '{}'", name)))?;
        builder = builder.filename(name);
    }
    if !args.libraries.is_empty() {
        let libraries = args
            .libraries
            .iter()
            .map(|spec| Library::parse(spec))
            .collect::<Result<Vec<_>>>()?;
        builder = builder.libraries(libraries);
    }
    if args.headed || args.listen {
        builder = builder.headless(false);
    }
    if args.open {
        builder = builder.open_after_save(true);
    }
    if let Some(secs) = args.ready_timeout {
        builder = builder.ready_timeout(Duration::from_secs(secs));
    }
    if let Some((width, height)) = args.window {
        builder = builder.window_size(width, height);
    }
    if let Some(chrome) = &args.chrome {
        builder = builder.chrome_path(Some(chrome.clone()));
    }

    builder.build().map_err(ExportError::Configuration)
}

#[cfg(feature = "env-config")]
fn base_builder() -> Result<ExportConfigBuilder> {
    use region2pdf::config::env;

    match env::load_env_file() {
        Ok(path) => log::info!("📁 Loaded configuration from: {:?}", path),
        Err(e) => log::debug!("📁 No {} file loaded: {}", env::ENV_FILE_NAME, e),
    }
    env::builder_from_env()
}

#[cfg(not(feature = "env-config"))]
fn base_builder() -> Result<ExportConfigBuilder> {
    Ok(ExportConfigBuilder::new())
}

fn parse_window_size(value: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", value))?;
    let width: u32 = width.trim().parse().map_err(|e| format!("bad width: {}", e))?;
    let height: u32 = height.trim().parse().map_err(|e| format!("bad height: {}", e))?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than 0".to_string());
    }
    Ok((width, height))
}
