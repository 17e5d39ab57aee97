//! # Static Batcher
//!
//! Static geometry batching for scenes of non-moving meshes: many small mesh
//! instances are merged into a few combined geometries so they draw in far
//! fewer calls.
//!
//! ## Features
//!
//! - **Eligibility filtering**: layer mask, empty/unreadable geometry,
//!   renderer state and engine-side checks, each rejection reported
//! - **Vertex-budget planning**: stable, order-preserving partitioning
//! - **Merging**: CPU combiner producing anchor-space geometry with submesh
//!   and material mapping, or any [`batching::MeshCombiner`]
//! - **Reversal**: exact restore of every renderer's original mesh
//!
//! ## Quick Start
//!
//! ```rust
//! use static_batcher::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut scene = Scene::new();
//! let cube = scene.add_geometry(Geometry::cube("crate"));
//! let root = scene.create_node("level", None)?;
//! for i in 0..3 {
//!     let node = scene.create_node(format!("crate{i}"), Some(root))?;
//!     scene.set_mesh(node, cube)?;
//!     scene.add_renderer(node, Vec::new())?;
//! }
//!
//! let mut batcher = StaticBatcher::new(BatcherConfig::manual(), root)?;
//! let report = batcher.batch(&mut scene)?;
//! assert_eq!(report.batch_count(), 1);
//!
//! batcher.unbatch(&mut scene);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod batching;
pub mod config;
pub mod foundation;
pub mod scene;

/// Common imports for batcher users
pub mod prelude {
    pub use crate::{
        batching::{
            Advisory, BatchReport, BatcherError, BatcherState, CpuMeshCombiner,
            EngineStateProbe, MeshCombiner, RejectReason, SceneStateProbe, StaticBatcher,
        },
        config::{BatcherConfig, Config, ConfigError, InitializationMode},
        foundation::{
            collections::{GeometryId, MaterialId, NodeId, RendererId, ShaderId},
            math::{Mat4, Vec3},
        },
        scene::{Geometry, LayerMask, Material, Scene, Shader, SubMesh, Vertex},
    };
}
