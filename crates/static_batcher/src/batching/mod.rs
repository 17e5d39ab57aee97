//! Static batching
//!
//! ## Pipeline
//!
//! ```text
//! Scene::mesh_instances ──> EligibilityFilter ──> plan() ──> MeshCombiner (per group)
//!                                                   │
//!                                                   └──> RestoreMap ──> unbatch()
//! ```
//!
//! [`StaticBatcher`] drives the pipeline and owns the restore map. The
//! combiner and the engine state probe are traits so hosts can plug in their
//! own merge routine and bookkeeping.

mod batcher;
mod combiner;
mod eligibility;
mod planner;
mod probe;

#[cfg(test)]
mod tests;

pub use batcher::{
    Advisory, BatchReport, BatcherError, BatcherResult, BatcherState, StaticBatcher,
};
pub use combiner::{
    BatchMember, CombineError, CombineResult, CombinedBatch, CpuMeshCombiner, MeshCombiner,
};
pub use eligibility::{EligibilityFilter, RejectReason, Verdict};
pub use planner::{plan, BatchBreak, BatchGroup, BatchPlan, RestoreEntry, RestoreMap};
pub use probe::{EngineStateProbe, SceneStateProbe};
