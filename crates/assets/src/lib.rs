//! Resource registries: named assets, textures and shader programs.
//!
//! Every registry is name-keyed and reference-counted. Acquiring a missing
//! name yields an immediately usable placeholder; the real data arrives later
//! through an out-of-band load whose completion is posted as a deferred event.
//!
//! # Invariants
//! - Refcounts never go negative; a handle is freed exactly when its count reaches zero.
//! - Every acquirer of a name observes the same handle instance.
//! - Completions for released entries are ignored.

mod asset;
mod context;
mod error;
mod loader;
pub mod path;
mod registry;
mod shader;
mod texture;

pub use asset::{
    Asset, AssetRegistry, AssetState, LoadMode, ResourceSettings, failed_event_code,
    loaded_event_code,
};
pub use context::{ResourceContext, ResourceStats, Slot};
pub use error::{AssetError, RegistryError};
pub use loader::{
    AssetData, AssetDigest, AssetLoader, ImageData, ImageLoader, JsonLoader, LoadedAsset,
    ShaderSourceLoader,
};
pub use registry::{Handle, Release, Resource, ResourceRegistry};
pub use shader::{ShaderProgram, ShaderRegistry, UniformValue};
pub use texture::{Texture, TextureRegistry};

pub fn crate_info() -> &'static str {
    "stagecraft-assets v0.1.0"
}
