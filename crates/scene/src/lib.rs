//! Scene graph: a tree of transformable nodes with cached world matrices,
//! drawn in depth order through a [`Renderer`](stagecraft_render::Renderer).
//!
//! [`Stage`] ties the graph to an event bus and the resource registries and
//! runs the per-frame sequence: update, pump loads, drain events, render.

mod camera;
mod config;
mod error;
mod graph;
mod material;
mod node;
mod stage;

pub use camera::Camera;
pub use config::{ConfigError, StageConfig};
pub use error::SceneError;
pub use graph::{Detached, SceneGraph};
pub use material::{
    BoundMaterial, DEFAULT_SHADER, Material, MaterialCtor, MaterialDesc, MaterialFactory,
};
pub use node::{Node, RootNode, calculate_model};
pub use stage::{Stage, TickReport};

pub fn crate_info() -> &'static str {
    "stagecraft-scene v0.1.0"
}
