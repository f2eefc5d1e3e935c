use std::collections::HashMap;

use glam::Mat4;
use stagecraft_assets::{ResourceContext, UniformValue};
use stagecraft_common::NodeId;
use stagecraft_events::EventBus;
use stagecraft_render::{DrawCommand, Renderer, Surface};

use crate::camera::Camera;
use crate::error::SceneError;
use crate::node::{Node, RootNode};

/// A subtree removed from the graph.
#[derive(Debug)]
pub struct Detached {
    /// The removed node, children list intact.
    pub node: Node,
    /// Its descendants in pre-order.
    pub descendants: Vec<Node>,
}

impl Detached {
    pub fn node_count(&self) -> usize {
        1 + self.descendants.len()
    }

    /// All nodes, subtree root first.
    pub fn into_nodes(self) -> impl Iterator<Item = Node> {
        std::iter::once(self.node).chain(self.descendants)
    }
}

/// The scene tree plus an id lookup over every registered node.
///
/// Nodes are owned by the lookup; the root is held separately and never
/// registered. A node with `parent() == None` is a direct child of the root.
#[derive(Debug, Default)]
pub struct SceneGraph {
    root: RootNode,
    nodes: HashMap<NodeId, Node>,
    camera: Camera,
    elapsed: f64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera(camera: Camera) -> Self {
        Self {
            camera,
            ..Self::default()
        }
    }

    pub fn root(&self) -> &RootNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RootNode {
        &mut self.root
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Total time passed to [`update`](Self::update).
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Children of `parent`, or of the root when `None`.
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => self.root.children(),
            Some(id) => self.nodes.get(&id).map(Node::children).unwrap_or_default(),
        }
    }

    /// Register `node` and attach it under the root.
    pub fn add_child(&mut self, node: Node) -> Result<NodeId, SceneError> {
        let id = self.register(node)?;
        self.root.children.push(id);
        tracing::debug!(node = %id, "added under root");
        Ok(id)
    }

    /// Register `node` and attach it under `parent`.
    pub fn add_child_to(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let id = self.register(node)?;
        self.link(parent, id);
        tracing::debug!(node = %id, %parent, "added");
        Ok(id)
    }

    fn register(&mut self, mut node: Node) -> Result<NodeId, SceneError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(SceneError::DuplicateNode(id));
        }
        node.unlink();
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Move `child` under `parent`. Returns `false` if it was already there.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<bool, SceneError> {
        for id in [parent, child] {
            if !self.nodes.contains_key(&id) {
                return Err(SceneError::NodeNotFound(id));
            }
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }
        let current = self.nodes.get(&child).and_then(Node::parent);
        if current == Some(parent) {
            return Ok(false);
        }
        self.unlink_from_parent(child, current);
        self.link(parent, child);
        Ok(true)
    }

    /// Move `child` out from under `parent` to the top level. It stays
    /// registered and keeps drawing.
    ///
    /// A `child` that is not a child of `parent` is logged and left alone.
    pub fn move_to_root(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(p) = self.nodes.get_mut(&parent) else {
            tracing::warn!(%parent, "move_to_root: unknown parent");
            return false;
        };
        if !p.drop_child(child) {
            return false;
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.set_parent(None);
        }
        self.root.children.push(child);
        true
    }

    /// Take `child` and its descendants out of the tree, but only if `child`
    /// is currently a child of `parent`. The subtree goes back to the caller.
    ///
    /// A `child` that is not a child of `parent` is logged and left alone.
    pub fn remove_child_of(&mut self, parent: NodeId, child: NodeId) -> Option<Detached> {
        let is_child = self
            .nodes
            .get(&parent)
            .is_some_and(|p| p.children().contains(&child));
        if !is_child {
            tracing::warn!(%parent, %child, "remove_child_of: not a child");
            return None;
        }
        self.remove_child(child)
    }

    /// Unregister `id` and its descendants and detach it from its parent.
    ///
    /// The lookup shrinks by [`Detached::node_count`], not by one.
    ///
    /// An unknown id is logged and yields `None`.
    pub fn remove_child(&mut self, id: NodeId) -> Option<Detached> {
        let Some(parent) = self.nodes.get(&id).map(Node::parent) else {
            tracing::warn!(node = %id, "remove_child: not registered");
            return None;
        };
        self.unlink_from_parent(id, parent);

        let mut node = self.nodes.remove(&id)?;
        node.set_parent(None);
        let mut descendants = Vec::new();
        let mut stack: Vec<NodeId> = node.children().iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if let Some(n) = self.nodes.remove(&next) {
                stack.extend(n.children().iter().rev().copied());
                descendants.push(n);
            }
        }
        tracing::debug!(node = %id, descendants = descendants.len(), "removed subtree");
        Some(Detached { node, descendants })
    }

    /// Recompute world matrices, parents before children.
    pub fn update(&mut self, time_step: f32) {
        let _span = tracing::debug_span!("scene_update", nodes = self.nodes.len()).entered();
        self.elapsed += f64::from(time_step);

        let root_world = self.root.world();
        let mut stack: Vec<(NodeId, Mat4)> = self
            .root
            .children
            .iter()
            .rev()
            .map(|id| (*id, root_world))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let world = parent_world * node.model();
            node.set_world(world);
            stack.extend(node.children().iter().rev().map(|c| (*c, world)));
        }
    }

    /// Draw the tree.
    ///
    /// Top-level nodes paint in ascending depth order, ties in insertion
    /// order; nested nodes paint in insertion order after their parent.
    pub fn render(
        &mut self,
        surface: &dyn Surface,
        renderer: &mut dyn Renderer,
        resources: &mut ResourceContext,
        bus: &mut EventBus,
    ) -> Result<(), SceneError> {
        let _span = tracing::debug_span!("scene_render").entered();
        let viewport = surface.size();
        self.camera.rebuild(viewport);
        let view_projection = self.camera.view_projection();

        let nodes = &self.nodes;
        self.root.children.sort_by(|a, b| {
            let da = nodes.get(a).map_or(0.0, Node::depth);
            let db = nodes.get(b).map_or(0.0, Node::depth);
            da.total_cmp(&db)
        });

        renderer.begin_frame(viewport);
        let mut ctx = RenderPass {
            renderer,
            resources,
            bus,
            view_projection,
        };
        ctx.renderer.save_state();
        let mut result = Ok(());
        for id in self.root.children.clone() {
            result = self.render_node(id, &mut ctx);
            if result.is_err() {
                break;
            }
        }
        let restored = ctx.renderer.restore_state();
        ctx.renderer.end_frame();
        result?;
        restored?;
        Ok(())
    }

    fn render_node(&mut self, id: NodeId, ctx: &mut RenderPass<'_>) -> Result<(), SceneError> {
        ctx.renderer.save_state();
        let result = self.render_node_inner(id, ctx);
        let restored = ctx.renderer.restore_state();
        result?;
        restored?;
        Ok(())
    }

    fn render_node_inner(&mut self, id: NodeId, ctx: &mut RenderPass<'_>) -> Result<(), SceneError> {
        let Some(node) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        if !node.is_visible() {
            return Ok(());
        }
        draw_node(node, ctx)?;
        for child in node.children().to_vec() {
            self.render_node(child, ctx)?;
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.push_child(child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.set_parent(Some(parent));
        }
    }

    fn unlink_from_parent(&mut self, child: NodeId, parent: Option<NodeId>) {
        match parent {
            Some(p) => {
                if let Some(p) = self.nodes.get_mut(&p) {
                    p.drop_child(child);
                }
            }
            None => self.root.children.retain(|c| *c != child),
        }
    }

    /// Whether `ancestor` lies on the parent chain of `node`.
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = self.nodes.get(&node).and_then(Node::parent);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(Node::parent);
        }
        false
    }
}

struct RenderPass<'a> {
    renderer: &'a mut dyn Renderer,
    resources: &'a mut ResourceContext,
    bus: &'a mut EventBus,
    view_projection: Mat4,
}

fn draw_node(node: &mut Node, ctx: &mut RenderPass<'_>) -> Result<(), SceneError> {
    let (id, world) = (node.id(), node.world());
    let Some(material) = node.material_mut() else {
        return Ok(());
    };
    let bound = material.bind(ctx.resources, ctx.bus)?;
    let tint = material.tint();

    let mut program = bound.shader.borrow_mut();
    program.bind();
    program.set_uniform("u_model", UniformValue::Mat4(world.to_cols_array()));
    program.set_uniform(
        "u_view_projection",
        UniformValue::Mat4(ctx.view_projection.to_cols_array()),
    );
    program.set_uniform("u_tint", UniformValue::Vec4(tint));
    let texture = bound.texture.as_ref().map(|t| t.borrow());
    let drawn = ctx.renderer.draw(&DrawCommand {
        node: id,
        name: node.name(),
        world,
        view_projection: ctx.view_projection,
        texture: texture.as_deref(),
        program: Some(&*program),
        tint,
    });
    program.unbind();
    drawn.map_err(SceneError::from)
}
