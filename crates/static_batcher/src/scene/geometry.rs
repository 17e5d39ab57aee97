//! Mesh geometry shared between scene nodes
//!
//! A [`Geometry`] is immutable once registered with the scene. Many nodes may
//! point at the same geometry, so batching never edits one in place; merged
//! output is always a new resource.

/// 3D vertex data structure
///
/// Position, normal and texture coordinate in the geometry's local space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// One drawable range of a geometry, drawn with one material slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubMesh {
    /// Triangle list indices into the owning geometry's vertices
    pub indices: Vec<u32>,
}

impl SubMesh {
    /// Create a submesh from triangle list indices
    pub fn new(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    /// Number of triangles in this submesh
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Mesh resource: vertices, submeshes and CPU readability
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Debug name
    pub name: String,

    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Submesh structure, one entry per material slot
    pub submeshes: Vec<SubMesh>,

    /// Whether vertex data is still available on the CPU
    ///
    /// Merging copies vertex data, so unreadable geometry cannot be batched.
    pub readable: bool,
}

impl Geometry {
    /// Create a readable geometry with a single submesh
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self::with_submeshes(name, vertices, vec![SubMesh::new(indices)])
    }

    /// Create a readable geometry with explicit submeshes
    pub fn with_submeshes(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        submeshes: Vec<SubMesh>,
    ) -> Self {
        Self {
            name: name.into(),
            vertices,
            submeshes,
            readable: true,
        }
    }

    /// Mark this geometry as GPU-only (not readable)
    #[must_use]
    pub fn unreadable(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        u32::try_from(self.vertices.len()).unwrap_or(u32::MAX)
    }

    /// Number of submeshes
    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Total index count across all submeshes
    pub fn index_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.indices.len()).sum()
    }

    /// Unit quad in the XZ plane facing +Y (4 vertices, 2 triangles)
    pub fn quad(name: impl Into<String>) -> Self {
        let up = [0.0, 1.0, 0.0];
        let vertices = vec![
            Vertex::new([-0.5, 0.0, -0.5], up, [0.0, 0.0]),
            Vertex::new([0.5, 0.0, -0.5], up, [1.0, 0.0]),
            Vertex::new([0.5, 0.0, 0.5], up, [1.0, 1.0]),
            Vertex::new([-0.5, 0.0, 0.5], up, [0.0, 1.0]),
        ];
        Self::new(name, vertices, vec![0, 2, 1, 0, 3, 2])
    }

    /// Cube with +-1 extents (8 vertices, 12 triangles)
    pub fn cube(name: impl Into<String>) -> Self {
        let vertices = vec![
            // Front face
            Vertex::new([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([-1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            // Back face
            Vertex::new([-1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 0.0]),
            Vertex::new([-1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new([1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new([1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 0.0]),
        ];

        let indices = vec![
            // Front
            0, 1, 2, 2, 3, 0,
            // Back
            4, 5, 6, 6, 7, 4,
            // Left
            4, 0, 3, 3, 5, 4,
            // Right
            1, 7, 6, 6, 2, 1,
            // Top
            3, 2, 6, 6, 5, 3,
            // Bottom
            4, 7, 1, 1, 0, 4,
        ];

        Self::new(name, vertices, indices)
    }

    /// Point cloud of `count` vertices with no triangles
    ///
    /// Handy for exercising vertex budgets without building real meshes.
    pub fn point_cloud(name: impl Into<String>, count: usize) -> Self {
        let vertices = (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f32;
                Vertex::new([x, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0])
            })
            .collect();
        Self::new(name, vertices, Vec::new())
    }
}
