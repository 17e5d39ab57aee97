//! Scene data model
//!
//! Stands in for the host engine's scene: a node hierarchy carrying meshes,
//! renderers and materials. The batcher reads candidates from it and rewrites
//! renderer mesh sources when merging or restoring.
//!
//! ## Ownership
//!
//! ```text
//! Scene
//!  ├── nodes      (hierarchy, layer, local transform, mesh, renderer)
//!  ├── geometries (shared, never edited in place)
//!  ├── materials  ──> shaders
//!  └── renderers  ──> node, materials, static batch info
//! ```

mod geometry;
mod instance;
mod layers;
mod material;
mod renderer;
mod scene_graph;

pub use geometry::{Geometry, SubMesh, Vertex};
pub use instance::{MeshInstance, RendererState};
pub use layers::{LayerMask, MAX_LAYER};
pub use material::{Material, Shader, DISABLE_BATCHING_TAG};
pub use renderer::{MeshRenderer, StaticBatchInfo};
pub use scene_graph::{Scene, SceneError, SceneNode};
