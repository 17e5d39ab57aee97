//! Per-pass snapshot of a mesh-carrying scene node

use crate::foundation::collections::{GeometryId, MaterialId, NodeId, RendererId};
use crate::foundation::math::Mat4;

/// Renderer state captured alongside a [`MeshInstance`]
#[derive(Debug, Clone, PartialEq)]
pub struct RendererState {
    /// Renderer handle
    pub id: RendererId,

    /// Whether the renderer is enabled
    pub enabled: bool,

    /// Materials in slot order
    pub materials: Vec<Option<MaterialId>>,
}

/// Candidate for batching, captured fresh on every pass
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    /// Node carrying the mesh
    pub node: NodeId,

    /// Node name, used to tag advisories
    pub name: String,

    /// Render layer of the node
    pub layer: u8,

    /// Node's local-to-world transform
    pub world_transform: Mat4,

    /// Shared geometry assigned to the node
    pub geometry: GeometryId,

    /// Vertex count of that geometry (0 when the handle is dangling)
    pub vertex_count: u32,

    /// Whether the geometry's vertex data is CPU readable
    pub readable: bool,

    /// Renderer attached to the node, if any
    pub renderer: Option<RendererState>,
}

impl MeshInstance {
    /// Renderer handle, if a renderer is attached
    pub fn renderer_id(&self) -> Option<RendererId> {
        self.renderer.as_ref().map(|r| r.id)
    }

    /// Whether the world transform mirrors geometry
    pub fn has_negative_scale(&self) -> bool {
        crate::foundation::math::is_mirrored(&self.world_transform)
    }
}
