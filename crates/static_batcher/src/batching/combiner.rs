//! Merging one batch group into a single combined geometry
//!
//! [`MeshCombiner`] is the seam toward the engine's static batching utility.
//! [`CpuMeshCombiner`] is a complete CPU implementation:
//!
//! ```text
//! member vertices ── inverse(anchor) * world ──> anchor-space vertices
//! member submeshes ── + vertex base (winding flipped if mirrored) ──> combined submeshes
//! member materials ── slot k ──> combined submesh (start + k)
//! ```
//!
//! Every input is validated before the scene is touched, so a failed combine
//! leaves no partial state behind. Source geometry is shared and is never
//! modified; the combined geometry is a new resource.

use crate::foundation::collections::{GeometryId, MaterialId, NodeId, RendererId};
use crate::foundation::math::{is_mirrored, normal_matrix, Mat3, Mat4, Point3, Vec3};
use crate::scene::{
    Geometry, MeshInstance, Scene, SceneError, StaticBatchInfo, SubMesh, Vertex,
};
use thiserror::Error;

/// Result type for combine operations
pub type CombineResult<T> = Result<T, CombineError>;

/// Errors raised while merging a group
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CombineError {
    /// Anchor node does not exist
    #[error("Anchor node not found: {0:?}")]
    MissingAnchor(NodeId),

    /// Anchor transform cannot be inverted
    #[error("Anchor node {0:?} has a singular transform")]
    SingularAnchor(NodeId),

    /// Member has no renderer
    #[error("Instance '{0}' has no renderer")]
    MissingRenderer(String),

    /// Member geometry handle does not resolve
    #[error("Geometry not found for instance '{0}'")]
    MissingGeometry(String),

    /// Member geometry is not CPU readable
    #[error("Geometry of instance '{0}' is not readable")]
    UnreadableGeometry(String),

    /// Combined data no longer fits 32-bit indices
    #[error("Combined geometry exceeds 32-bit index range")]
    IndexOverflow,

    /// Scene rejected a mesh source update
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Placement of one member inside a combined geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchMember {
    /// Member renderer
    pub renderer: RendererId,

    /// Member node
    pub node: NodeId,

    /// First vertex of the member in the combined geometry
    pub vertex_base: u32,

    /// First submesh of the member in the combined geometry
    pub submesh_start: u32,

    /// Number of submeshes contributed by the member
    pub submesh_count: u32,

    /// Member winding was reversed because its transform mirrors
    pub mirrored: bool,
}

/// Output of merging one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedBatch {
    /// 1-based batch index written to every member renderer
    pub batch_index: u32,

    /// Newly created combined geometry
    pub geometry: GeometryId,

    /// Members in group order
    pub members: Vec<BatchMember>,

    /// Material drawn with each combined submesh
    pub submesh_materials: Vec<Option<MaterialId>>,
}

/// Merges the members of one group into a drawable relative to `anchor`
///
/// Implementations must create new geometry rather than editing shared
/// sources, and must point each member renderer at the merged result and mark
/// it as statically batched.
pub trait MeshCombiner {
    /// Merge `instances` into one combined geometry expressed in `anchor` space
    fn combine(
        &mut self,
        scene: &mut Scene,
        instances: &[MeshInstance],
        anchor: NodeId,
    ) -> CombineResult<CombinedBatch>;
}

/// CPU combiner copying and transforming vertex data
#[derive(Debug, Clone)]
pub struct CpuMeshCombiner {
    next_batch_index: u32,
}

impl Default for CpuMeshCombiner {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuMeshCombiner {
    /// Create a combiner; batch indices start at 1
    pub fn new() -> Self {
        Self { next_batch_index: 1 }
    }

    /// Index the next combined batch will receive
    pub fn next_batch_index(&self) -> u32 {
        self.next_batch_index
    }
}

/// Merged buffers before they are registered with the scene
struct Merged {
    vertices: Vec<Vertex>,
    submeshes: Vec<SubMesh>,
    submesh_materials: Vec<Option<MaterialId>>,
    members: Vec<BatchMember>,
}

fn transform_vertex(vertex: &Vertex, matrix: &Mat4, normals: &Mat3) -> Vertex {
    let position = matrix.transform_point(&Point3::from(vertex.position));
    let normal = (normals * Vec3::from(vertex.normal))
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vec3::zeros);
    Vertex::new(position.into(), normal.into(), vertex.tex_coord)
}

fn offset_indices(indices: &[u32], base: u32, flip: bool) -> CombineResult<Vec<u32>> {
    let shifted = indices
        .iter()
        .map(|&i| i.checked_add(base).ok_or(CombineError::IndexOverflow))
        .collect::<CombineResult<Vec<u32>>>()?;
    if !flip {
        return Ok(shifted);
    }

    let mut flipped = Vec::with_capacity(shifted.len());
    let triangles = shifted.chunks_exact(3);
    let remainder = triangles.remainder();
    for triangle in triangles {
        flipped.extend_from_slice(&[triangle[0], triangle[2], triangle[1]]);
    }
    flipped.extend_from_slice(remainder);
    Ok(flipped)
}

fn merge(scene: &Scene, instances: &[MeshInstance], to_anchor: &Mat4) -> CombineResult<Merged> {
    let mut merged = Merged {
        vertices: Vec::new(),
        submeshes: Vec::new(),
        submesh_materials: Vec::new(),
        members: Vec::with_capacity(instances.len()),
    };

    for instance in instances {
        let renderer_id = instance
            .renderer_id()
            .ok_or_else(|| CombineError::MissingRenderer(instance.name.clone()))?;
        let renderer = scene
            .renderer(renderer_id)
            .ok_or_else(|| CombineError::MissingRenderer(instance.name.clone()))?;
        let source = scene
            .geometry(instance.geometry)
            .ok_or_else(|| CombineError::MissingGeometry(instance.name.clone()))?;
        if !source.readable {
            return Err(CombineError::UnreadableGeometry(instance.name.clone()));
        }

        let local = to_anchor * instance.world_transform;
        let normals = normal_matrix(&local);
        let mirrored = is_mirrored(&local);
        let vertex_base =
            u32::try_from(merged.vertices.len()).map_err(|_| CombineError::IndexOverflow)?;
        let submesh_start =
            u32::try_from(merged.submeshes.len()).map_err(|_| CombineError::IndexOverflow)?;

        merged
            .vertices
            .extend(source.vertices.iter().map(|v| transform_vertex(v, &local, &normals)));

        for (slot, submesh) in source.submeshes.iter().enumerate() {
            let indices = offset_indices(&submesh.indices, vertex_base, mirrored)?;
            merged.submeshes.push(SubMesh::new(indices));
            merged
                .submesh_materials
                .push(renderer.materials.get(slot).copied().flatten());
        }

        merged.members.push(BatchMember {
            renderer: renderer_id,
            node: instance.node,
            vertex_base,
            submesh_start,
            submesh_count: u32::try_from(source.submeshes.len())
                .map_err(|_| CombineError::IndexOverflow)?,
            mirrored,
        });
    }

    Ok(merged)
}

impl MeshCombiner for CpuMeshCombiner {
    fn combine(
        &mut self,
        scene: &mut Scene,
        instances: &[MeshInstance],
        anchor: NodeId,
    ) -> CombineResult<CombinedBatch> {
        let anchor_world = scene
            .world_transform(anchor)
            .ok_or(CombineError::MissingAnchor(anchor))?;
        let to_anchor = anchor_world
            .try_inverse()
            .ok_or(CombineError::SingularAnchor(anchor))?;

        let merged = merge(scene, instances, &to_anchor)?;

        let batch_index = self.next_batch_index;
        self.next_batch_index += 1;

        let combined = Geometry::with_submeshes(
            format!("Combined Mesh (batch {batch_index})"),
            merged.vertices,
            merged.submeshes,
        )
        .unreadable();
        log::debug!(
            "Combined {} instance(s) into '{}' ({} vertices, {} submeshes)",
            merged.members.len(),
            combined.name,
            combined.vertex_count(),
            combined.submesh_count()
        );
        let geometry = scene.add_geometry(combined);

        for member in &merged.members {
            scene.set_mesh_source(member.renderer, geometry)?;
            if let Some(renderer) = scene.renderer_mut(member.renderer) {
                renderer.static_batch = Some(StaticBatchInfo {
                    batch_index,
                    geometry,
                    submesh_start: member.submesh_start,
                    submesh_count: member.submesh_count,
                });
            }
        }

        Ok(CombinedBatch {
            batch_index,
            geometry,
            members: merged.members,
            submesh_materials: merged.submesh_materials,
        })
    }
}
