use stagecraft_assets::RegistryError;
use stagecraft_common::NodeId;
use stagecraft_render::RenderError;

/// Errors from scene operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("node {0} is already registered")]
    DuplicateNode(NodeId),
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("material tag {0:?} is already registered")]
    DuplicateTag(String),
    #[error("unknown material tag {0:?}")]
    UnknownMaterialTag(String),
    #[error("invalid {tag} material: {reason}")]
    InvalidMaterial { tag: String, reason: String },
    #[error("material descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
