use glam::{Mat4, Vec2, Vec3};
use stagecraft_common::{NodeId, Transform2D};

use crate::material::Material;

/// Local model matrix for a transform.
///
/// `T(position, -depth) · T(+half) · Rz(rotation) · T(-half) · S(scale)`:
/// rotation pivots around the node's own center, not its origin.
pub fn calculate_model(t: &Transform2D) -> Mat4 {
    let half = t.half_extent();
    Mat4::from_translation(Vec3::new(t.position.x, t.position.y, -t.depth))
        * Mat4::from_translation(half.extend(0.0))
        * Mat4::from_rotation_z(t.rotation)
        * Mat4::from_translation((-half).extend(0.0))
        * Mat4::from_scale(t.scale.extend(1.0))
}

/// An element of the scene tree.
///
/// Nodes live in a [`SceneGraph`](crate::SceneGraph) arena and refer to each
/// other by id. The cached model matrix is recomputed on every transform
/// setter; the world matrix is written by the graph's update pass.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transform: Transform2D,
    model: Mat4,
    world: Mat4,
    material: Option<Material>,
}

impl Node {
    pub fn create(
        id: NodeId,
        name: impl Into<String>,
        position: Vec2,
        depth: f32,
        scale: Vec2,
        rotation: f32,
    ) -> Self {
        let transform = Transform2D::new(position, depth, scale, rotation);
        let model = calculate_model(&transform);
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform,
            model,
            world: model,
            material: None,
        }
    }

    /// A node with the default transform.
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        let t = Transform2D::default();
        Self::create(id, name, t.position, t.depth, t.scale, t.rotation)
    }

    /// A node that draws itself with `material`.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order. Read-only; structure changes go through the graph.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn transform(&self) -> &Transform2D {
        &self.transform
    }

    pub fn depth(&self) -> f32 {
        self.transform.depth
    }

    /// Cached local model matrix.
    pub fn model(&self) -> Mat4 {
        self.model
    }

    /// World matrix as of the last update pass.
    pub fn world(&self) -> Mat4 {
        self.world
    }

    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    pub fn material_mut(&mut self) -> Option<&mut Material> {
        self.material.as_mut()
    }

    pub fn set_material(&mut self, material: Option<Material>) -> Option<Material> {
        std::mem::replace(&mut self.material, material)
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.transform.position = position;
        self.model = self.calculate_model();
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.transform.scale = scale;
        self.model = self.calculate_model();
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.transform.rotation = rotation;
        self.model = self.calculate_model();
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.transform.depth = depth;
        self.model = self.calculate_model();
    }

    pub fn set_transform(&mut self, transform: Transform2D) {
        self.transform = transform;
        self.model = self.calculate_model();
    }

    pub fn calculate_model(&self) -> Mat4 {
        calculate_model(&self.transform)
    }

    /// Culling hook. Everything is visible for now.
    pub fn is_visible(&self) -> bool {
        true
    }

    /// Append `child` unless already present. Returns whether it was added.
    pub(crate) fn push_child(&mut self, child: NodeId) -> bool {
        if self.children.contains(&child) {
            return false;
        }
        self.children.push(child);
        true
    }

    /// Remove `child` if present; a miss is logged, not an error.
    pub(crate) fn drop_child(&mut self, child: NodeId) -> bool {
        let Some(pos) = self.children.iter().position(|c| *c == child) else {
            tracing::warn!(parent = %self.id, %child, "remove_child: not a child");
            return false;
        };
        self.children.remove(pos);
        true
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn set_world(&mut self, world: Mat4) {
        self.world = world;
    }

    /// Forget structural links before (re)insertion into a graph.
    pub(crate) fn unlink(&mut self) {
        self.parent = None;
        self.children.clear();
    }
}

/// The tree root. Not registered in the id lookup and never has a parent.
#[derive(Debug)]
pub struct RootNode {
    transform: Transform2D,
    model: Mat4,
    pub(crate) children: Vec<NodeId>,
}

impl Default for RootNode {
    fn default() -> Self {
        let transform = Transform2D::default();
        Self {
            model: calculate_model(&transform),
            transform,
            children: Vec::new(),
        }
    }
}

impl RootNode {
    /// Top-level children in paint order as of the last render.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn transform(&self) -> &Transform2D {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform2D) {
        self.transform = transform;
        self.model = calculate_model(&transform);
    }

    /// The root's world matrix is its model matrix.
    pub fn world(&self) -> Mat4 {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn default_node_has_identity_model() {
        let n = Node::new(NodeId(1), "n");
        assert_eq!(n.model(), Mat4::IDENTITY);
        assert!(n.children().is_empty());
        assert!(n.parent().is_none());
    }

    #[test]
    fn model_translates_and_offsets_depth() {
        let n = Node::create(NodeId(1), "n", Vec2::new(10.0, 20.0), 3.0, Vec2::ONE, 0.0);
        let origin = n.model().transform_point3(Vec3::ZERO);
        assert!(approx(origin, Vec3::new(10.0, 20.0, -3.0)));
    }

    #[test]
    fn rotation_pivots_around_center() {
        let n = Node::create(
            NodeId(1),
            "n",
            Vec2::ZERO,
            0.0,
            Vec2::new(10.0, 10.0),
            FRAC_PI_2,
        );
        // The unit quad's center maps to the scaled center regardless of rotation.
        let center = n.model().transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert!(approx(center, Vec3::new(5.0, 5.0, 0.0)));
        // A corner moves: (0,0) rotates a quarter turn about (5,5) to (10,0).
        let corner = n.model().transform_point3(Vec3::ZERO);
        assert!(approx(corner, Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn setters_recompute_immediately() {
        let mut n = Node::new(NodeId(1), "n");
        n.set_position(Vec2::new(4.0, 0.0));
        assert!(approx(n.model().transform_point3(Vec3::ZERO), Vec3::new(4.0, 0.0, 0.0)));
        n.set_depth(2.0);
        assert!(approx(n.model().transform_point3(Vec3::ZERO), Vec3::new(4.0, 0.0, -2.0)));
        n.set_scale(Vec2::new(2.0, 3.0));
        assert!(approx(
            n.model().transform_point3(Vec3::new(1.0, 1.0, 0.0)),
            Vec3::new(6.0, 3.0, -2.0)
        ));
        n.set_rotation(0.3);
        assert_eq!(n.model(), n.calculate_model());
    }

    #[test]
    fn calculate_model_is_deterministic() {
        let t = Transform2D::new(Vec2::new(1.25, -7.5), 0.5, Vec2::new(3.0, 9.0), 1.1);
        let a = calculate_model(&t).to_cols_array();
        let b = calculate_model(&t).to_cols_array();
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn push_child_is_idempotent() {
        let mut n = Node::new(NodeId(1), "n");
        assert!(n.push_child(NodeId(2)));
        assert!(!n.push_child(NodeId(2)));
        assert_eq!(n.children(), &[NodeId(2)]);
    }

    #[test]
    fn drop_missing_child_is_noop() {
        let mut n = Node::new(NodeId(1), "n");
        n.push_child(NodeId(2));
        assert!(!n.drop_child(NodeId(3)));
        assert!(n.drop_child(NodeId(2)));
        assert!(n.children().is_empty());
    }

    #[test]
    fn root_world_is_its_model() {
        let mut root = RootNode::default();
        root.set_transform(Transform2D::new(Vec2::new(5.0, 5.0), 0.0, Vec2::ONE, 0.0));
        assert!(approx(
            root.world().transform_point3(Vec3::ZERO),
            Vec3::new(5.0, 5.0, 0.0)
        ));
    }
}
