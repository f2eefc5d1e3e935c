use std::fmt::Write as _;

use glam::{Mat4, UVec2};
use stagecraft_assets::{ShaderProgram, Texture};
use stagecraft_common::NodeId;

/// Errors reported by a renderer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("draw rejected for node {node}: {reason}")]
    DrawRejected { node: NodeId, reason: String },
    #[error("restore_state without matching save_state")]
    StateUnderflow,
}

/// Supplies the current viewport size on demand.
///
/// Implemented by the windowing layer; read every frame rather than cached.
pub trait Surface {
    fn size(&self) -> UVec2;
}

/// A surface of constant size, for headless runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSurface {
    pub width: u32,
    pub height: u32,
}

impl FixedSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Surface for FixedSurface {
    fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

/// One node's draw request.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    pub node: NodeId,
    pub name: &'a str,
    /// World matrix of the node.
    pub world: Mat4,
    pub view_projection: Mat4,
    pub texture: Option<&'a Texture>,
    /// Bound program; unready programs mean "use the fallback pipeline".
    pub program: Option<&'a ShaderProgram>,
    pub tint: [f32; 4],
}

/// Renderer-agnostic interface. All backends implement this trait.
///
/// The traversal brackets every node in `save_state`/`restore_state` and
/// issues `draw` for nodes that have something to show.
pub trait Renderer {
    fn begin_frame(&mut self, _viewport: UVec2) {}

    fn save_state(&mut self);

    fn restore_state(&mut self) -> Result<(), RenderError>;

    fn draw(&mut self, command: &DrawCommand<'_>) -> Result<(), RenderError>;

    fn end_frame(&mut self) {}
}

/// An owned copy of a [`DrawCommand`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub node: NodeId,
    pub name: String,
    pub world: Mat4,
    pub texture_size: Option<(u32, u32)>,
    pub program: Option<String>,
    pub program_ready: bool,
    pub tint: [f32; 4],
    /// Save-state nesting depth at the time of the draw.
    pub state_depth: usize,
}

/// Headless renderer that records the command stream.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    draws: Vec<RecordedDraw>,
    state_depth: usize,
    saves: usize,
    restores: usize,
    frames: u64,
    viewport: UVec2,
    reject: Vec<NodeId>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every draw for `node` fail.
    pub fn reject_node(&mut self, node: NodeId) {
        self.reject.push(node);
    }

    /// Draws recorded since the last `begin_frame`.
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Node ids in paint order.
    pub fn draw_order(&self) -> Vec<NodeId> {
        self.draws.iter().map(|d| d.node).collect()
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn restores(&self) -> usize {
        self.restores
    }

    pub fn state_depth(&self) -> usize {
        self.state_depth
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Human-readable dump of the last frame.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame {} ({}x{}) ===",
            self.frames, self.viewport.x, self.viewport.y
        );
        let _ = writeln!(out, "Draws: {}", self.draws.len());
        for d in &self.draws {
            let t = d.world.w_axis;
            let texture = d
                .texture_size
                .map_or_else(|| "-".to_string(), |(w, h)| format!("{w}x{h}"));
            let _ = writeln!(
                out,
                "  {} {:<12} at=({:.1}, {:.1}, {:.1}) tex={} program={}{}",
                d.node,
                d.name,
                t.x,
                t.y,
                t.z,
                texture,
                d.program.as_deref().unwrap_or("-"),
                if d.program_ready { "" } else { " (fallback)" },
            );
        }
        out
    }
}

impl Renderer for RecordingRenderer {
    fn begin_frame(&mut self, viewport: UVec2) {
        self.frames += 1;
        self.viewport = viewport;
        self.draws.clear();
        self.saves = 0;
        self.restores = 0;
    }

    fn save_state(&mut self) {
        self.state_depth += 1;
        self.saves += 1;
    }

    fn restore_state(&mut self) -> Result<(), RenderError> {
        if self.state_depth == 0 {
            return Err(RenderError::StateUnderflow);
        }
        self.state_depth -= 1;
        self.restores += 1;
        Ok(())
    }

    fn draw(&mut self, command: &DrawCommand<'_>) -> Result<(), RenderError> {
        if self.reject.contains(&command.node) {
            return Err(RenderError::DrawRejected {
                node: command.node,
                reason: "rejected by renderer".into(),
            });
        }
        tracing::trace!(node = %command.node, name = command.name, "draw");
        self.draws.push(RecordedDraw {
            node: command.node,
            name: command.name.to_string(),
            world: command.world,
            texture_size: command.texture.map(Texture::size),
            program: command.program.map(|p| p.name.clone()),
            program_ready: command.program.is_some_and(ShaderProgram::is_ready),
            tint: command.tint,
            state_depth: self.state_depth,
        });
        Ok(())
    }
}
