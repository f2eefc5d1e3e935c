use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use stagecraft_assets::{Handle, RegistryError, ResourceContext, ShaderProgram, Texture};
use stagecraft_events::EventBus;

use crate::error::SceneError;

/// Shader used by materials that do not name one.
pub const DEFAULT_SHADER: &str = "shaders/sprite.glsl";

const WHITE: [f32; 4] = [1.0; 4];

fn white() -> [f32; 4] {
    WHITE
}

/// Serialized form of a material: a type tag plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub shader: Option<String>,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default = "white")]
    pub tint: [f32; 4],
}

impl MaterialDesc {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            shader: None,
            texture: None,
            tint: WHITE,
        }
    }
}

/// Handles held by a material after its first bind.
#[derive(Debug, Clone)]
pub struct BoundMaterial {
    pub shader: Handle<ShaderProgram>,
    pub texture: Option<Handle<Texture>>,
}

/// Names the resources a node draws with.
///
/// Resources are acquired lazily on the first [`bind`](Self::bind) and held
/// until [`release`](Self::release), one reference per resource.
#[derive(Debug)]
pub struct Material {
    tag: String,
    shader: String,
    texture: Option<String>,
    tint: [f32; 4],
    bound: Option<BoundMaterial>,
}

impl Material {
    pub fn new(
        tag: impl Into<String>,
        shader: impl Into<String>,
        texture: Option<String>,
        tint: [f32; 4],
    ) -> Self {
        Self {
            tag: tag.into(),
            shader: shader.into(),
            texture,
            tint,
            bound: None,
        }
    }

    /// Textured sprite with the default shader.
    pub fn sprite(texture: impl Into<String>) -> Self {
        Self::new("sprite", DEFAULT_SHADER, Some(texture.into()), WHITE)
    }

    /// Flat tint with the default shader.
    pub fn color(tint: [f32; 4]) -> Self {
        Self::new("color", DEFAULT_SHADER, None, tint)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn shader(&self) -> &str {
        &self.shader
    }

    pub fn texture(&self) -> Option<&str> {
        self.texture.as_deref()
    }

    pub fn tint(&self) -> [f32; 4] {
        self.tint
    }

    pub fn set_tint(&mut self, tint: [f32; 4]) {
        self.tint = tint;
    }

    pub fn is_acquired(&self) -> bool {
        self.bound.is_some()
    }

    /// Handles for drawing, acquiring them on first use.
    pub fn bind(
        &mut self,
        resources: &mut ResourceContext,
        bus: &mut EventBus,
    ) -> Result<BoundMaterial, RegistryError> {
        if let Some(bound) = &self.bound {
            return Ok(bound.clone());
        }
        let shader = resources.acquire_shader(&self.shader, bus)?;
        let texture = match &self.texture {
            Some(name) => Some(resources.acquire_texture(name, bus)?),
            None => None,
        };
        tracing::debug!(tag = %self.tag, shader = %self.shader, "material acquired");
        let bound = BoundMaterial { shader, texture };
        self.bound = Some(bound.clone());
        Ok(bound)
    }

    /// Return held resources to the registries. No-op if never bound.
    ///
    /// The handles are kept if the registries refuse the release.
    pub fn release(
        &mut self,
        resources: &mut ResourceContext,
        bus: &mut EventBus,
    ) -> Result<(), RegistryError> {
        if self.bound.is_none() {
            return Ok(());
        }
        resources.release_shader(&self.shader, bus)?;
        if let Some(name) = &self.texture {
            resources.release_texture(name, bus)?;
        }
        self.bound = None;
        Ok(())
    }
}

/// Builds a material from its descriptor.
pub type MaterialCtor = Rc<dyn Fn(&MaterialDesc) -> Result<Material, SceneError>>;

/// Closed registry mapping type tags to material constructors.
#[derive(Clone, Default)]
pub struct MaterialFactory {
    ctors: BTreeMap<String, MaterialCtor>,
}

impl std::fmt::Debug for MaterialFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialFactory")
            .field("tags", &self.tags())
            .finish()
    }
}

impl MaterialFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with the `sprite` and `color` tags registered.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.ctors.insert("sprite".into(), Rc::new(build_sprite));
        factory.ctors.insert("color".into(), Rc::new(build_color));
        factory
    }

    pub fn register<F>(&mut self, tag: impl Into<String>, ctor: F) -> Result<(), SceneError>
    where
        F: Fn(&MaterialDesc) -> Result<Material, SceneError> + 'static,
    {
        let tag = tag.into();
        if self.ctors.contains_key(&tag) {
            return Err(SceneError::DuplicateTag(tag));
        }
        self.ctors.insert(tag, Rc::new(ctor));
        Ok(())
    }

    pub fn create(&self, desc: &MaterialDesc) -> Result<Material, SceneError> {
        let ctor = self
            .ctors
            .get(&desc.tag)
            .ok_or_else(|| SceneError::UnknownMaterialTag(desc.tag.clone()))?;
        ctor(desc)
    }

    pub fn create_from_json(&self, json: &str) -> Result<Material, SceneError> {
        let desc: MaterialDesc = serde_json::from_str(json)?;
        self.create(&desc)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.ctors.keys().map(String::as_str).collect()
    }
}

fn build_sprite(desc: &MaterialDesc) -> Result<Material, SceneError> {
    let texture = desc.texture.clone().ok_or_else(|| SceneError::InvalidMaterial {
        tag: desc.tag.clone(),
        reason: "missing texture".into(),
    })?;
    Ok(Material::new(
        desc.tag.clone(),
        desc.shader.as_deref().unwrap_or(DEFAULT_SHADER),
        Some(texture),
        desc.tint,
    ))
}

fn build_color(desc: &MaterialDesc) -> Result<Material, SceneError> {
    Ok(Material::new(
        desc.tag.clone(),
        desc.shader.as_deref().unwrap_or(DEFAULT_SHADER),
        None,
        desc.tint,
    ))
}
