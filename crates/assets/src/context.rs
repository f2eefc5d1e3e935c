use std::collections::HashMap;
use std::rc::Rc;

use stagecraft_events::{Event, EventBus, HandlerRef};

use crate::asset::{AssetRegistry, ResourceSettings, loaded_event_code};
use crate::error::RegistryError;
use crate::loader::{AssetData, LoadedAsset};
use crate::registry::{Handle, Release, Resource, ResourceRegistry};
use crate::shader::{ShaderProgram, ShaderRegistry};
use crate::texture::{Texture, TextureRegistry};

/// A single-instance holder with an explicit init/reset lifecycle.
#[derive(Debug)]
pub struct Slot<T> {
    kind: &'static str,
    value: Option<T>,
}

impl<T> Slot<T> {
    pub const fn empty(kind: &'static str) -> Self {
        Self { kind, value: None }
    }

    /// Install the instance. A second call without `take` is an error.
    pub fn init(&mut self, value: T) -> Result<&mut T, RegistryError> {
        if self.value.is_some() {
            return Err(RegistryError::AlreadyInitialized(self.kind));
        }
        Ok(self.value.insert(value))
    }

    pub fn get(&self) -> Result<&T, RegistryError> {
        self.value
            .as_ref()
            .ok_or(RegistryError::Uninitialized(self.kind))
    }

    pub fn get_mut(&mut self) -> Result<&mut T, RegistryError> {
        self.value
            .as_mut()
            .ok_or(RegistryError::Uninitialized(self.kind))
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }
}

/// Counts reported by [`ResourceContext::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub assets: usize,
    pub textures: usize,
    pub shaders: usize,
    pub loads_in_flight: usize,
}

/// A resource that can absorb a completed asset load.
trait ApplyLoaded {
    fn apply_loaded(&mut self, loaded: &LoadedAsset) -> bool;
}

impl ApplyLoaded for Texture {
    fn apply_loaded(&mut self, loaded: &LoadedAsset) -> bool {
        match &loaded.data {
            AssetData::Image(image) => self.apply_image(image),
            _ => {
                tracing::warn!(path = %loaded.path, "texture asset is not an image");
                false
            }
        }
    }
}

impl ApplyLoaded for ShaderProgram {
    fn apply_loaded(&mut self, loaded: &LoadedAsset) -> bool {
        match &loaded.data {
            AssetData::Text(source) => self.apply_source(source.clone()),
            _ => {
                tracing::warn!(path = %loaded.path, "shader asset is not source text");
                false
            }
        }
    }
}

/// The asset, texture and shader registries plus the bus wiring between them.
///
/// Constructed empty and initialized explicitly; every accessor fails with
/// [`RegistryError::Uninitialized`] before [`init`](Self::init).
///
/// Textures and shaders are backed by a named asset of the same canonical
/// path. The first acquisition of a texture acquires its asset and subscribes
/// a handler to the asset's load-completion event; freeing the texture
/// releases the asset and drops the subscription.
#[derive(Debug)]
pub struct ResourceContext {
    assets: Slot<AssetRegistry>,
    textures: Slot<TextureRegistry>,
    shaders: Slot<ShaderRegistry>,
    texture_listeners: Listeners,
    shader_listeners: Listeners,
}

#[derive(Default)]
struct Listeners(HashMap<String, HandlerRef>);

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl Default for ResourceContext {
    fn default() -> Self {
        Self {
            assets: Slot::empty("asset"),
            textures: Slot::empty("texture"),
            shaders: Slot::empty("shader"),
            texture_listeners: Listeners::default(),
            shader_listeners: Listeners::default(),
        }
    }
}

impl ResourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize all registries with the default loaders.
    pub fn init(&mut self, settings: ResourceSettings) -> Result<(), RegistryError> {
        self.init_with(AssetRegistry::with_default_loaders(settings))
    }

    /// Initialize around a preconfigured asset registry.
    pub fn init_with(&mut self, assets: AssetRegistry) -> Result<(), RegistryError> {
        let slots = [
            (self.assets.is_initialized(), self.assets.kind),
            (self.textures.is_initialized(), self.textures.kind),
            (self.shaders.is_initialized(), self.shaders.kind),
        ];
        if let Some((_, kind)) = slots.iter().find(|(initialized, _)| *initialized) {
            return Err(RegistryError::AlreadyInitialized(*kind));
        }
        self.assets.init(assets)?;
        self.textures.init(TextureRegistry::new())?;
        self.shaders.init(ShaderRegistry::new())?;
        tracing::debug!("resource registries initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.assets.is_initialized()
    }

    /// Free everything and return to the uninitialized state.
    pub fn reset(&mut self, bus: &mut EventBus) {
        for (key, listener) in self.texture_listeners.0.drain() {
            bus.unsubscribe(&loaded_event_code(&key), &listener);
        }
        for (key, listener) in self.shader_listeners.0.drain() {
            bus.unsubscribe(&loaded_event_code(&key), &listener);
        }
        if let Some(mut textures) = self.textures.take() {
            textures.clear();
        }
        if let Some(mut shaders) = self.shaders.take() {
            shaders.clear();
        }
        if let Some(mut assets) = self.assets.take() {
            assets.clear();
        }
        tracing::debug!("resource registries reset");
    }

    pub fn assets(&self) -> Result<&AssetRegistry, RegistryError> {
        self.assets.get()
    }

    pub fn assets_mut(&mut self) -> Result<&mut AssetRegistry, RegistryError> {
        self.assets.get_mut()
    }

    pub fn textures(&self) -> Result<&TextureRegistry, RegistryError> {
        self.textures.get()
    }

    pub fn shaders(&self) -> Result<&ShaderRegistry, RegistryError> {
        self.shaders.get()
    }

    pub fn acquire_texture(
        &mut self,
        name: &str,
        bus: &mut EventBus,
    ) -> Result<Handle<Texture>, RegistryError> {
        Ok(acquire_backed(
            self.assets.get_mut()?,
            self.textures.get_mut()?,
            &mut self.texture_listeners,
            bus,
            name,
        ))
    }

    pub fn release_texture(
        &mut self,
        name: &str,
        bus: &mut EventBus,
    ) -> Result<Release, RegistryError> {
        Ok(release_backed(
            self.assets.get_mut()?,
            self.textures.get_mut()?,
            &mut self.texture_listeners,
            bus,
            name,
        ))
    }

    pub fn acquire_shader(
        &mut self,
        name: &str,
        bus: &mut EventBus,
    ) -> Result<Handle<ShaderProgram>, RegistryError> {
        Ok(acquire_backed(
            self.assets.get_mut()?,
            self.shaders.get_mut()?,
            &mut self.shader_listeners,
            bus,
            name,
        ))
    }

    pub fn release_shader(
        &mut self,
        name: &str,
        bus: &mut EventBus,
    ) -> Result<Release, RegistryError> {
        Ok(release_backed(
            self.assets.get_mut()?,
            self.shaders.get_mut()?,
            &mut self.shader_listeners,
            bus,
            name,
        ))
    }

    /// Apply finished loads; see [`AssetRegistry::pump`].
    pub fn pump(&mut self, bus: &mut EventBus) -> Result<usize, RegistryError> {
        Ok(self.assets.get_mut()?.pump(bus))
    }

    pub fn stats(&self) -> Result<ResourceStats, RegistryError> {
        let assets = self.assets.get()?;
        Ok(ResourceStats {
            assets: assets.len(),
            textures: self.textures.get()?.len(),
            shaders: self.shaders.get()?.len(),
            loads_in_flight: assets.in_flight(),
        })
    }
}

fn acquire_backed<T>(
    assets: &mut AssetRegistry,
    registry: &mut ResourceRegistry<T>,
    listeners: &mut Listeners,
    bus: &mut EventBus,
    name: &str,
) -> Handle<T>
where
    T: Resource + ApplyLoaded + 'static,
{
    let key = assets.canonicalize(name);
    let (handle, created) = registry.acquire_with_status(&key);
    if !created {
        return handle;
    }

    let listener = completion_listener(&handle);
    bus.subscribe(loaded_event_code(&key), Rc::clone(&listener));
    listeners.0.insert(key.clone(), listener);

    let asset = assets.acquire(&key);
    // Already loaded through another holder; no completion event will follow.
    if let Some(loaded) = asset.borrow().loaded() {
        handle.borrow_mut().apply_loaded(loaded);
    }
    handle
}

fn release_backed<T: Resource>(
    assets: &mut AssetRegistry,
    registry: &mut ResourceRegistry<T>,
    listeners: &mut Listeners,
    bus: &mut EventBus,
    name: &str,
) -> Release {
    let key = assets.canonicalize(name);
    let outcome = registry.release(&key);
    if outcome == Release::Freed {
        if let Some(listener) = listeners.0.remove(&key) {
            bus.unsubscribe(&loaded_event_code(&key), &listener);
        }
        assets.release(&key);
    }
    outcome
}

/// Handler that applies a load completion to `handle` if it is still alive.
fn completion_listener<T>(handle: &Handle<T>) -> HandlerRef
where
    T: Resource + ApplyLoaded + 'static,
{
    let weak = Rc::downgrade(handle);
    Rc::new(move |event: &Event| {
        let Some(handle) = weak.upgrade() else {
            tracing::trace!(code = event.code(), "completion for dropped {}", T::KIND);
            return;
        };
        let Some(loaded) = event.context_as::<LoadedAsset>() else {
            tracing::warn!(code = event.code(), "completion event without asset payload");
            return;
        };
        if !handle.borrow_mut().apply_loaded(loaded) {
            tracing::debug!(path = %loaded.path, "completion not applied");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::LoadMode;

    fn settings_in(dir: &std::path::Path) -> ResourceSettings {
        ResourceSettings {
            asset_root: "assets/".into(),
            base_dir: dir.to_path_buf(),
            load_mode: LoadMode::Inline,
        }
    }

    fn write_file(dir: &std::path::Path, rel: &str, contents: &[u8]) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn write_png(dir: &std::path::Path, rel: &str, w: u32, h: u32) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::new(w, h).save(path).unwrap();
    }

    #[test]
    fn access_before_init_fails() {
        let mut ctx = ResourceContext::new();
        let mut bus = EventBus::new();
        assert_eq!(
            ctx.textures().unwrap_err(),
            RegistryError::Uninitialized("texture")
        );
        assert_eq!(
            ctx.acquire_texture("a.png", &mut bus).unwrap_err(),
            RegistryError::Uninitialized("asset")
        );
        assert!(ctx.pump(&mut bus).is_err());
    }

    #[test]
    fn double_init_fails() {
        let mut ctx = ResourceContext::new();
        ctx.init(ResourceSettings::default()).unwrap();
        assert_eq!(
            ctx.init(ResourceSettings::default()),
            Err(RegistryError::AlreadyInitialized("asset"))
        );
    }

    #[test]
    fn reset_allows_reinit() {
        let mut ctx = ResourceContext::new();
        let mut bus = EventBus::new();
        ctx.init(ResourceSettings::default()).unwrap();
        let tex = ctx.acquire_texture("a.png", &mut bus).unwrap();
        ctx.reset(&mut bus);
        assert!(!ctx.is_initialized());
        assert!(tex.borrow().is_freed());
        assert_eq!(bus.subscriber_count(&loaded_event_code("assets/a.png")), 0);
        ctx.init(ResourceSettings::default()).unwrap();
    }

    #[test]
    fn texture_fills_in_after_pump_and_drain() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "assets/hero.png", 16, 8);
        let mut ctx = ResourceContext::new();
        ctx.init(settings_in(dir.path())).unwrap();
        let mut bus = EventBus::new();

        let tex = ctx.acquire_texture("hero.png", &mut bus).unwrap();
        assert_eq!(tex.borrow().size(), (1, 1));

        ctx.pump(&mut bus).unwrap();
        assert_eq!(tex.borrow().size(), (1, 1));

        bus.drain_default();
        assert_eq!(tex.borrow().size(), (16, 8));
        assert!(tex.borrow().is_loaded());

        let again = ctx.acquire_texture("assets/hero.png", &mut bus).unwrap();
        assert!(Rc::ptr_eq(&tex, &again));
        assert_eq!(ctx.textures().unwrap().refcount("assets/hero.png"), Some(2));
        assert_eq!(ctx.assets().unwrap().refcount("assets/hero.png"), Some(1));
    }

    #[test]
    fn freeing_texture_releases_asset_and_subscription() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "assets/a.png", 2, 2);
        let mut ctx = ResourceContext::new();
        ctx.init(settings_in(dir.path())).unwrap();
        let mut bus = EventBus::new();
        let code = loaded_event_code("assets/a.png");

        ctx.acquire_texture("a.png", &mut bus).unwrap();
        ctx.acquire_texture("a.png", &mut bus).unwrap();
        assert_eq!(bus.subscriber_count(&code), 1);

        assert_eq!(ctx.release_texture("a.png", &mut bus).unwrap(), Release::Retained(1));
        assert_eq!(ctx.release_texture("a.png", &mut bus).unwrap(), Release::Freed);
        assert_eq!(bus.subscriber_count(&code), 0);
        assert!(ctx.assets().unwrap().get("a.png").is_none());
        assert_eq!(ctx.release_texture("a.png", &mut bus).unwrap(), Release::Missing);
    }

    #[test]
    fn completion_queued_before_release_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "assets/a.png", 4, 4);
        let mut ctx = ResourceContext::new();
        ctx.init(settings_in(dir.path())).unwrap();
        let mut bus = EventBus::new();

        let tex = ctx.acquire_texture("a.png", &mut bus).unwrap();
        ctx.pump(&mut bus).unwrap();
        assert_eq!(bus.pending(), 1);

        ctx.release_texture("a.png", &mut bus).unwrap();
        bus.drain_default();
        assert!(tex.borrow().is_freed());
        assert_eq!(tex.borrow().size(), (0, 0));
    }

    #[test]
    fn texture_over_already_loaded_asset_is_filled_immediately() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "assets/a.png", 3, 3);
        let mut ctx = ResourceContext::new();
        ctx.init(settings_in(dir.path())).unwrap();
        let mut bus = EventBus::new();

        ctx.assets_mut().unwrap().acquire("a.png");
        ctx.pump(&mut bus).unwrap();

        let tex = ctx.acquire_texture("a.png", &mut bus).unwrap();
        assert_eq!(tex.borrow().size(), (3, 3));
        assert_eq!(ctx.assets().unwrap().refcount("a.png"), Some(2));
    }

    #[test]
    fn shader_source_arrives_through_bus() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "assets/shaders/sprite.glsl", b"void main() {}");
        let mut ctx = ResourceContext::new();
        ctx.init(settings_in(dir.path())).unwrap();
        let mut bus = EventBus::new();

        let program = ctx.acquire_shader("shaders/sprite.glsl", &mut bus).unwrap();
        assert!(!program.borrow().is_ready());
        ctx.pump(&mut bus).unwrap();
        bus.drain_default();
        assert_eq!(program.borrow().source(), Some("void main() {}"));

        let stats = ctx.stats().unwrap();
        assert_eq!(stats.shaders, 1);
        assert_eq!(stats.assets, 1);
        assert_eq!(stats.loads_in_flight, 0);
    }

    #[test]
    fn unsupported_texture_keeps_placeholder() {
        let mut ctx = ResourceContext::new();
        ctx.init(ResourceSettings::default()).unwrap();
        let mut bus = EventBus::new();
        let tex = ctx.acquire_texture("clip.mp4", &mut bus).unwrap();
        assert_eq!(ctx.pump(&mut bus).unwrap(), 0);
        bus.drain_default();
        assert_eq!(tex.borrow().size(), (1, 1));
    }
}
