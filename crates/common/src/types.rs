use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied identifier for a node in a scene graph.
///
/// Ids are never generated by the graph itself; uniqueness is checked when a
/// node is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Local 2D transform of a node.
///
/// `depth` doubles as paint order (lower paints first) and as a Z offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    pub position: Vec2,
    pub scale: Vec2,
    /// Rotation in radians around the node's own center.
    pub rotation: f32,
    pub depth: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            depth: 0.0,
        }
    }
}

impl Transform2D {
    pub fn new(position: Vec2, depth: f32, scale: Vec2, rotation: f32) -> Self {
        Self {
            position,
            scale,
            rotation,
            depth,
        }
    }

    /// Half of the scale, the pivot used for center rotation.
    pub fn half_extent(&self) -> Vec2 {
        self.scale * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId(7).to_string(), "#7");
        assert_eq!(NodeId::from(3), NodeId(3));
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform2D::default();
        assert_eq!(t.position, Vec2::ZERO);
        assert_eq!(t.scale, Vec2::ONE);
        assert_eq!(t.rotation, 0.0);
        assert_eq!(t.depth, 0.0);
    }

    #[test]
    fn half_extent_is_half_scale() {
        let t = Transform2D::new(Vec2::ZERO, 0.0, Vec2::new(64.0, 32.0), 0.0);
        assert_eq!(t.half_extent(), Vec2::new(32.0, 16.0));
    }
}
