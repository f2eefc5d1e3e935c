//! Rendering adapter: the interface the scene traversal draws through.
//!
//! # Invariants
//! - Renderers never mutate the scene; they receive finished world matrices.
//! - `save_state`/`restore_state` calls arrive in balanced pairs.
//!
//! GPU submission lives behind [`Renderer`]. [`RecordingRenderer`] keeps the
//! command stream in memory for headless runs and tests.

mod renderer;

pub use renderer::{
    DrawCommand, FixedSurface, RecordedDraw, RecordingRenderer, RenderError, Renderer, Surface,
};

pub fn crate_info() -> &'static str {
    "stagecraft-render v0.1.0"
}
