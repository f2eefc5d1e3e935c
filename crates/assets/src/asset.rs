use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stagecraft_events::{Event, EventBus, EventSource};

use crate::error::AssetError;
use crate::loader::{
    AssetLoader, ImageLoader, JsonLoader, LoadedAsset, ShaderSourceLoader, load_with,
};
use crate::path;
use crate::registry::{Handle, Release, Resource, ResourceRegistry};

/// Event code posted (Normal priority) when `path` finishes loading.
pub fn loaded_event_code(path: &str) -> String {
    format!("asset_loaded:{path}")
}

/// Event code posted (Normal priority) when loading `path` fails.
pub fn failed_event_code(path: &str) -> String {
    format!("asset_failed:{path}")
}

/// Where load jobs run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Run on a spawned worker thread. `acquire` never waits on I/O.
    #[default]
    Threaded,
    /// Run on the calling thread inside `acquire`; the result is still only
    /// observed on the next pump. Opt-in for deterministic tests and tooling.
    Inline,
}

/// Settings shared by the resource registries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    /// Prefix every registry key carries.
    pub asset_root: String,
    /// Filesystem directory canonical paths are resolved against.
    pub base_dir: PathBuf,
    pub load_mode: LoadMode,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            asset_root: "assets/".into(),
            base_dir: PathBuf::from("."),
            load_mode: LoadMode::Threaded,
        }
    }
}

/// Load state of a named asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    Pending,
    Loaded(Rc<LoadedAsset>),
    Failed(String),
    /// No registered loader handles the extension.
    Unsupported,
    Freed,
}

/// Registry entry for a named asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub path: String,
    pub state: AssetState,
}

impl Asset {
    pub fn loaded(&self) -> Option<&Rc<LoadedAsset>> {
        match &self.state {
            AssetState::Loaded(l) => Some(l),
            _ => None,
        }
    }
}

impl Resource for Asset {
    const KIND: &'static str = "asset";

    fn placeholder(name: &str) -> Self {
        Self {
            path: name.to_string(),
            state: AssetState::Pending,
        }
    }

    fn free(&mut self) {
        self.state = AssetState::Freed;
    }
}

struct LoadCompletion {
    path: String,
    generation: u64,
    result: Result<LoadedAsset, AssetError>,
}

/// Named-asset registry.
///
/// Keys are canonical paths. The first acquisition of a path dispatches a load
/// to the first loader whose extension set matches; results come back through
/// a channel and are applied by [`pump`](Self::pump), which posts a deferred
/// event per completion.
pub struct AssetRegistry {
    settings: ResourceSettings,
    loaders: Vec<Arc<dyn AssetLoader>>,
    entries: ResourceRegistry<Asset>,
    completions_tx: flume::Sender<LoadCompletion>,
    completions_rx: flume::Receiver<LoadCompletion>,
    /// Generation of the load each live entry is waiting on.
    live_loads: HashMap<String, u64>,
    next_generation: u64,
    in_flight: usize,
}

impl AssetRegistry {
    /// Registry without loaders.
    pub fn new(settings: ResourceSettings) -> Self {
        let (completions_tx, completions_rx) = flume::unbounded();
        Self {
            settings,
            loaders: Vec::new(),
            entries: ResourceRegistry::new(),
            completions_tx,
            completions_rx,
            live_loads: HashMap::new(),
            next_generation: 0,
            in_flight: 0,
        }
    }

    /// Registry with the image, shader-source and JSON loaders.
    pub fn with_default_loaders(settings: ResourceSettings) -> Self {
        let mut registry = Self::new(settings);
        registry.register_loader(Arc::new(ImageLoader));
        registry.register_loader(Arc::new(ShaderSourceLoader));
        registry.register_loader(Arc::new(JsonLoader));
        registry
    }

    /// Append a loader. Earlier loaders win on overlapping extensions.
    pub fn register_loader(&mut self, loader: Arc<dyn AssetLoader>) {
        tracing::debug!(loader = loader.name(), "registered asset loader");
        self.loaders.push(loader);
    }

    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    pub fn canonicalize(&self, name: &str) -> String {
        path::canonicalize(&self.settings.asset_root, name)
    }

    /// The loader that would handle `name`.
    pub fn loader_for(&self, name: &str) -> Result<Arc<dyn AssetLoader>, AssetError> {
        let canonical = self.canonicalize(name);
        let ext = path::extension(&canonical)
            .ok_or_else(|| AssetError::Unsupported(canonical.clone()))?;
        self.loaders
            .iter()
            .find(|l| l.handles(&ext))
            .cloned()
            .ok_or(AssetError::Unsupported(canonical))
    }

    /// Acquire an asset, dispatching its load on first acquisition.
    pub fn acquire(&mut self, name: &str) -> Handle<Asset> {
        let canonical = self.canonicalize(name);
        let (handle, created) = self.entries.acquire_with_status(&canonical);
        if created {
            match self.loader_for(&canonical) {
                Ok(loader) => self.dispatch(canonical, loader),
                Err(e) => {
                    tracing::warn!(path = %canonical, "{e}");
                    handle.borrow_mut().state = AssetState::Unsupported;
                }
            }
        }
        handle
    }

    pub fn release(&mut self, name: &str) -> Release {
        let canonical = self.canonicalize(name);
        let outcome = self.entries.release(&canonical);
        if outcome == Release::Freed {
            self.live_loads.remove(&canonical);
        }
        outcome
    }

    pub fn get(&self, name: &str) -> Option<Handle<Asset>> {
        self.entries.get(&self.canonicalize(name))
    }

    pub fn refcount(&self, name: &str) -> Option<u32> {
        self.entries.refcount(&self.canonicalize(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.names()
    }

    /// Loads dispatched but not yet pumped.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply finished loads and post one deferred event per completion.
    ///
    /// Completions for entries released in the meantime are dropped, even if
    /// the path has been acquired again since. Returns the number of
    /// completions applied.
    pub fn pump(&mut self, bus: &mut EventBus) -> usize {
        let mut applied = 0;
        while let Ok(LoadCompletion {
            path,
            generation,
            result,
        }) = self.completions_rx.try_recv()
        {
            self.in_flight = self.in_flight.saturating_sub(1);
            if self.live_loads.get(&path) != Some(&generation) {
                tracing::debug!(%path, generation, "stale completion ignored");
                continue;
            }
            self.live_loads.remove(&path);
            let Some(handle) = self.entries.get(&path) else {
                continue;
            };
            match result {
                Ok(loaded) => {
                    let loaded = Rc::new(loaded);
                    handle.borrow_mut().state = AssetState::Loaded(Rc::clone(&loaded));
                    tracing::debug!(%path, digest = loaded.digest.0, "asset loaded");
                    bus.post(
                        Event::new(loaded_event_code(&path), EventSource::Registry(Asset::KIND))
                            .with_shared_context(loaded),
                    );
                }
                Err(e) => {
                    tracing::warn!(%path, "asset load failed: {e}");
                    let message = e.to_string();
                    handle.borrow_mut().state = AssetState::Failed(message.clone());
                    bus.post(
                        Event::new(failed_event_code(&path), EventSource::Registry(Asset::KIND))
                            .with_context(message),
                    );
                }
            }
            applied += 1;
        }
        applied
    }

    /// Free every entry. Loads still in flight complete into nothing.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.live_loads.clear();
    }

    fn dispatch(&mut self, canonical: String, loader: Arc<dyn AssetLoader>) {
        let file = self.settings.base_dir.join(&canonical);
        let generation = self.next_generation;
        self.next_generation += 1;
        self.live_loads.insert(canonical.clone(), generation);
        let tx = self.completions_tx.clone();
        let job = move || {
            let result = std::fs::read(&file)
                .map_err(AssetError::from)
                .and_then(|bytes| load_with(loader.as_ref(), &canonical, &bytes));
            // The receiver lives as long as the registry; a send error means it is gone.
            let _ = tx.send(LoadCompletion {
                path: canonical,
                generation,
                result,
            });
        };
        self.in_flight += 1;
        match self.settings.load_mode {
            LoadMode::Inline => job(),
            LoadMode::Threaded => {
                std::thread::spawn(job);
            }
        }
    }
}

impl std::fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("settings", &self.settings)
            .field("loaders", &self.loaders.iter().map(|l| l.name()).collect::<Vec<_>>())
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
