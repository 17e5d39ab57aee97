//! Mesh renderer component

use crate::foundation::collections::{GeometryId, MaterialId, NodeId};

/// Engine-side record written when a renderer joins a static batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticBatchInfo {
    /// 1-based index of the batch this renderer belongs to
    pub batch_index: u32,

    /// Combined geometry the renderer now draws from
    pub geometry: GeometryId,

    /// First submesh of the combined geometry owned by this renderer
    pub submesh_start: u32,

    /// Number of consecutive submeshes owned by this renderer
    pub submesh_count: u32,
}

/// Draws the mesh assigned to its node with an ordered list of materials
#[derive(Debug, Clone)]
pub struct MeshRenderer {
    /// Node this renderer is attached to
    pub node: NodeId,

    /// Whether the renderer is enabled
    pub enabled: bool,

    /// Material per submesh slot; `None` marks an empty slot
    pub materials: Vec<Option<MaterialId>>,

    /// Static batch membership, set by the combiner
    pub static_batch: Option<StaticBatchInfo>,
}

impl MeshRenderer {
    /// Create an enabled, unbatched renderer
    pub fn new(node: NodeId, materials: Vec<Option<MaterialId>>) -> Self {
        Self {
            node,
            enabled: true,
            materials,
            static_batch: None,
        }
    }

    /// Whether this renderer is part of a static batch
    pub fn is_statically_batched(&self) -> bool {
        self.static_batch.is_some_and(|info| info.batch_index > 0)
    }

    /// First submesh index inside the combined geometry (0 when unbatched)
    pub fn submesh_start_index(&self) -> u32 {
        self.static_batch.map_or(0, |info| info.submesh_start)
    }
}
