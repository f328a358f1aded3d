//! Awaited, load-once availability of export dependencies.
//!
//! Two kinds of dependency exist:
//!
//! - **Page-side libraries** ([`Library`]): scripts the page needs before it
//!   can be captured (chart renderers, fonts loaders, ...). They are injected
//!   through a [`ScriptHost`] and the load is awaited before capture starts.
//!   [`LibraryLoader`] remembers which library ids are loaded in which page,
//!   so re-running an export never inserts the same script twice.
//! - **The rasterizer backend** (the browser process): created lazily, once,
//!   through [`LoadedOnce`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::{ExportError, Result};

/// A page-side script dependency, identified by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Library {
    /// Identity used by the load guard.
    pub id: String,
    /// Script URL injected into the page.
    pub url: String,
}

impl Library {
    /// Create a library from an id and URL.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Parse an `id=url` pair, as given on the command line.
    ///
    /// ```rust
    /// use region2pdf::Library;
    ///
    /// let lib = Library::parse("rasterizer=http://127.0.0.1:8050/assets/raster.js").unwrap();
    /// assert_eq!(lib.id, "rasterizer");
    /// assert!(Library::parse("no-separator").is_err());
    /// ```
    pub fn parse(spec: &str) -> Result<Self> {
        let (id, url) = spec.split_once('=').ok_or_else(|| {
            ExportError::Configuration(format!("library must be given as id=url, got '{}'", spec))
        })?;

        let (id, url) = (id.trim(), url.trim());
        if id.is_empty() || url.is_empty() {
            return Err(ExportError::Configuration(format!(
                "library id and url must not be empty: '{}'",
                spec
            )));
        }

        url::Url::parse(url).map_err(|e| {
            ExportError::Configuration(format!("invalid url for library '{}': {}", id, e))
        })?;

        Ok(Self::new(id, url))
    }
}

/// Something scripts can be injected into, typically one browser tab.
pub trait ScriptHost {
    /// Identity of the page; load guards are scoped to it.
    fn host_id(&self) -> String;

    /// Inject the script at `url` and block until it has loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the script fails to load.
    fn load_script(&self, url: &str) -> Result<()>;
}

/// Libraries recorded as loaded in one host.
type HostLibraries = Arc<Mutex<HashSet<String>>>;

/// Load-once guard for page-side libraries, keyed by host and library id.
///
/// Each host has its own lock, so a slow load in one tab never holds up
/// another tab.
#[derive(Debug, Default)]
pub struct LibraryLoader {
    hosts: Mutex<HashMap<String, HostLibraries>>,
}

impl LibraryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `library` is loaded in `host`, loading it if needed.
    ///
    /// Returns `true` if the library was loaded by this call and `false` if
    /// it was already available. The host's guard is held during the load,
    /// so concurrent callers never inject the same library twice into the
    /// same page.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::LibraryLoad`] if the host failed to load it.
    pub fn ensure_loaded<H>(&self, host: &H, library: &Library) -> Result<bool>
    where
        H: ScriptHost + ?Sized,
    {
        let host_id = host.host_id();
        let poisoned = |e: String| ExportError::LibraryLoad {
            id: library.id.clone(),
            reason: format!("loader state poisoned: {}", e),
        };

        let libraries = {
            let mut hosts = self.hosts.lock().map_err(|e| poisoned(e.to_string()))?;
            Arc::clone(hosts.entry(host_id.clone()).or_default())
        };
        let mut loaded = libraries.lock().map_err(|e| poisoned(e.to_string()))?;

        if loaded.contains(&library.id) {
            log::trace!("Library '{}' already loaded in {}", library.id, host_id);
            return Ok(false);
        }

        log::debug!("Loading library '{}' from {}", library.id, library.url);
        host.load_script(&library.url).map_err(|e| {
            log::error!("❌ Library '{}' failed to load: {}", library.id, e);
            match e {
                ExportError::LibraryLoad { .. } => e,
                other => ExportError::LibraryLoad {
                    id: library.id.clone(),
                    reason: other.to_string(),
                },
            }
        })?;

        loaded.insert(library.id.clone());
        Ok(true)
    }

    /// Load every library in order, stopping at the first failure.
    ///
    /// Returns the number of libraries that were actually loaded.
    pub fn ensure_all<H>(&self, host: &H, libraries: &[Library]) -> Result<usize>
    where
        H: ScriptHost + ?Sized,
    {
        let mut newly_loaded = 0;
        for library in libraries {
            if self.ensure_loaded(host, library)? {
                newly_loaded += 1;
            }
        }
        Ok(newly_loaded)
    }

    /// Whether a library id is recorded as loaded in a host.
    pub fn is_loaded(&self, host_id: &str, library_id: &str) -> bool {
        let libraries = match self.hosts.lock() {
            Ok(hosts) => hosts.get(host_id).cloned(),
            Err(_) => None,
        };
        libraries
            .and_then(|libs| libs.lock().ok().map(|libs| libs.contains(library_id)))
            .unwrap_or(false)
    }

    /// Drop the records for a host, e.g. after its tab was closed.
    pub fn forget_host(&self, host_id: &str) {
        if let Ok(mut hosts) = self.hosts.lock() {
            hosts.remove(host_id);
        }
    }
}

/// Value the [`inject_script_js`] promise resolves to on success.
pub const SCRIPT_LOADED: &str = "loaded";

/// JavaScript that injects a script tag for `url` and waits for it to load.
///
/// The promise resolves to [`SCRIPT_LOADED`] or to the error message. The
/// snippet reuses an existing `<script>` with the same `src`, so running it
/// twice in the same page inserts one tag. A tag the page shipped itself
/// already fired its `load` event; it counts as loaded once the browser has
/// fetched it or the document has finished loading.
pub fn inject_script_js(url: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    let src = serde_json::Value::String(url.to_string()).to_string();
    format!(
        r#"new Promise((resolve, reject) => {{
    const src = {src};
    let tag = Array.from(document.scripts).find((s) => s.getAttribute('src') === src);
    if (tag && tag.dataset.region2pdfLoaded === 'true') {{ resolve(true); return; }}
    if (tag && tag.dataset.region2pdfPending !== 'true') {{
        const fetched = performance.getEntriesByName(tag.src).length > 0;
        if (fetched || document.readyState === 'complete') {{
            tag.dataset.region2pdfLoaded = 'true';
            resolve(true);
            return;
        }}
    }}
    if (!tag) {{
        tag = document.createElement('script');
        tag.dataset.region2pdfPending = 'true';
        tag.setAttribute('src', src);
        document.head.appendChild(tag);
    }}
    tag.addEventListener('load', () => {{
        tag.dataset.region2pdfLoaded = 'true';
        delete tag.dataset.region2pdfPending;
        resolve(true);
    }});
    tag.addEventListener('error', () => reject(new Error('failed to load ' + src)));
}}).then(() => "{SCRIPT_LOADED}", (e) => String(e))"#
    )
}

/// A value created on first use and shared afterwards.
///
/// Used for the browser process: the first export launches it, later
/// exports reuse it.
#[derive(Debug)]
pub struct LoadedOnce<T> {
    cell: Mutex<Option<Arc<T>>>,
}

impl<T> LoadedOnce<T> {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(None),
        }
    }

    /// Return the value, creating it with `init` if the cell is empty.
    ///
    /// A failed `init` leaves the cell empty so the next call retries.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut cell = self.cell.lock().map_err(|e| {
            ExportError::BrowserCreation(format!("backend state poisoned: {}", e))
        })?;

        if let Some(value) = cell.as_ref() {
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(init()?);
        *cell = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Whether the value has been created.
    pub fn is_loaded(&self) -> bool {
        self.cell.lock().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Empty the cell, returning the previous value.
    pub fn reset(&self) -> Option<Arc<T>> {
        self.cell.lock().ok().and_then(|mut c| c.take())
    }
}

impl<T> Default for LoadedOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
