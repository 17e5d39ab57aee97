//! Batch/unbatch entry points and the planner state machine
//!
//! ```text
//! Idle ──batch()──> Planning ──> Merging ──> Batched
//!  ^                                            │
//!  └───────────────────unbatch()────────────────┘
//! ```
//!
//! A batcher owns the restore map of its latest pass. Calling `batch()` while
//! batched is refused, so the map for the live pass can never be overwritten.

use super::combiner::{CombineError, CombinedBatch, CpuMeshCombiner, MeshCombiner};
use super::eligibility::{EligibilityFilter, RejectReason, Verdict};
use super::planner::{plan, RestoreMap};
use super::probe::{EngineStateProbe, SceneStateProbe};
use crate::config::{BatcherConfig, ConfigError, InitializationMode};
use crate::foundation::collections::{NodeId, RendererId};
use crate::scene::Scene;
use thiserror::Error;

/// Result type for batcher operations
pub type BatcherResult<T> = Result<T, BatcherError>;

/// Hard failures of a batching pass
#[derive(Debug, Error)]
pub enum BatcherError {
    /// Configuration rejected at construction
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `batch()` called while the previous pass is still applied
    #[error("Already batched; call unbatch() before batching again")]
    AlreadyBatched,

    /// Anchor node is not part of the scene
    #[error("Anchor node not found: {0:?}")]
    MissingAnchor(NodeId),

    /// The combiner failed on a group; mesh sources were restored
    #[error("Combining batch group {group} failed: {source}")]
    Combine {
        /// Index of the failing group
        group: usize,
        /// Combiner error
        #[source]
        source: CombineError,
    },
}

/// Lifecycle state of a batcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatcherState {
    /// No pass applied
    #[default]
    Idle,
    /// Enumerating, filtering and partitioning candidates
    Planning,
    /// Invoking the combiner per group
    Merging,
    /// A pass is applied and can be reversed
    Batched,
}

/// Non-fatal finding reported by a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Instance left out of the pass
    Rejected {
        /// Node of the instance
        node: NodeId,
        /// Node name
        name: String,
        /// Reason for the rejection
        reason: RejectReason,
    },
    /// Instance accepted with a mirrored transform
    NegativeScale {
        /// Node of the instance
        node: NodeId,
        /// Node name
        name: String,
    },
    /// Vertex budget forced a new batch at this instance
    VertexLimitBreak {
        /// Node of the instance
        node: NodeId,
        /// Node name
        name: String,
    },
    /// Instance exceeds the vertex budget on its own and was batched alone
    OversizedInstance {
        /// Node of the instance
        node: NodeId,
    },
    /// Merged renderer is not reported as statically batched
    MembershipMismatch {
        /// Renderer that should have joined a batch
        renderer: RendererId,
    },
}

/// Summary of one `batch()` call
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Mesh-carrying nodes enumerated
    pub candidates: usize,

    /// Instances accepted by the eligibility filter
    pub eligible: usize,

    /// Combined batches, one per group
    pub batches: Vec<CombinedBatch>,

    /// Findings in the order they were raised
    pub advisories: Vec<Advisory>,
}

impl BatchReport {
    /// Number of combined batches
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Number of instances merged across all batches
    pub fn batched_instances(&self) -> usize {
        self.batches.iter().map(|b| b.members.len()).sum()
    }

    /// Rejections grouped by reason
    pub fn rejections(&self, reason: RejectReason) -> usize {
        self.advisories
            .iter()
            .filter(|a| matches!(a, Advisory::Rejected { reason: r, .. } if *r == reason))
            .count()
    }
}

/// Static batcher bound to one anchor node
///
/// Merged geometry is expressed in the anchor's space. With
/// [`BatcherConfig::is_global`] unset, only the anchor's subtree is searched.
pub struct StaticBatcher<C: MeshCombiner = CpuMeshCombiner, P: EngineStateProbe = SceneStateProbe> {
    config: BatcherConfig,
    anchor: NodeId,
    filter: EligibilityFilter,
    combiner: C,
    probe: P,
    restore_map: RestoreMap,
    state: BatcherState,
}

impl StaticBatcher {
    /// Create a batcher using the CPU combiner and the scene probe
    pub fn new(config: BatcherConfig, anchor: NodeId) -> BatcherResult<Self> {
        Self::with_capabilities(config, anchor, CpuMeshCombiner::new(), SceneStateProbe)
    }
}

impl<C: MeshCombiner, P: EngineStateProbe> StaticBatcher<C, P> {
    /// Create a batcher with custom combine and probe capabilities
    pub fn with_capabilities(
        config: BatcherConfig,
        anchor: NodeId,
        combiner: C,
        probe: P,
    ) -> BatcherResult<Self> {
        config.validate()?;
        Ok(Self {
            filter: EligibilityFilter::new(&config),
            config,
            anchor,
            combiner,
            probe,
            restore_map: RestoreMap::default(),
            state: BatcherState::Idle,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Anchor node
    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    /// Current lifecycle state
    pub fn state(&self) -> BatcherState {
        self.state
    }

    /// Original meshes recorded by the latest pass
    pub fn restore_map(&self) -> &RestoreMap {
        &self.restore_map
    }

    /// Combiner used for merging
    pub fn combiner(&self) -> &C {
        &self.combiner
    }

    /// Hook for the owning object's creation
    pub fn on_create(&mut self, scene: &mut Scene) -> BatcherResult<Option<BatchReport>> {
        self.run_if(InitializationMode::OnCreate, scene)
    }

    /// Hook for the owning object's first activation
    pub fn on_activate(&mut self, scene: &mut Scene) -> BatcherResult<Option<BatchReport>> {
        self.run_if(InitializationMode::OnActivate, scene)
    }

    fn run_if(
        &mut self,
        mode: InitializationMode,
        scene: &mut Scene,
    ) -> BatcherResult<Option<BatchReport>> {
        if self.config.initialization_mode != mode {
            return Ok(None);
        }
        self.batch(scene).map(Some)
    }

    /// Filter, plan and merge every candidate in scope
    ///
    /// Rejected instances only produce advisories. A pass that merges nothing
    /// leaves the batcher idle. A combiner failure undoes the groups merged so
    /// far, restores every planned renderer's mesh source and leaves the
    /// batcher idle.
    pub fn batch(&mut self, scene: &mut Scene) -> BatcherResult<BatchReport> {
        if self.state == BatcherState::Batched {
            return Err(BatcherError::AlreadyBatched);
        }
        if scene.node(self.anchor).is_none() {
            return Err(BatcherError::MissingAnchor(self.anchor));
        }

        self.state = BatcherState::Planning;
        let mut report = BatchReport::default();

        let candidates = scene.mesh_instances(self.anchor, self.config.is_global);
        report.candidates = candidates.len();

        let mut eligible = Vec::with_capacity(candidates.len());
        for instance in candidates {
            match self.filter.evaluate(scene, &self.probe, &instance) {
                Verdict::Accept { negative_scale } => {
                    if negative_scale {
                        report.advisories.push(Advisory::NegativeScale {
                            node: instance.node,
                            name: instance.name.clone(),
                        });
                    }
                    eligible.push(instance);
                }
                Verdict::Reject(reason) => {
                    log::debug!("'{}' excluded from batching: {}", instance.name, reason);
                    report.advisories.push(Advisory::Rejected {
                        node: instance.node,
                        name: instance.name,
                        reason,
                    });
                }
            }
        }
        report.eligible = eligible.len();

        let plan = plan(eligible, self.config.vertex_budget);
        report.advisories.extend(plan.breaks.iter().map(|b| Advisory::VertexLimitBreak {
            node: b.node,
            name: b.name.clone(),
        }));
        report
            .advisories
            .extend(plan.oversized.iter().map(|&node| Advisory::OversizedInstance { node }));
        self.restore_map = plan.restore_map;

        if plan.groups.is_empty() {
            self.state = BatcherState::Idle;
            log::info!(
                "Static batching: nothing to merge among {} candidate(s)",
                report.candidates
            );
            return Ok(report);
        }

        self.state = BatcherState::Merging;
        for (index, group) in plan.groups.iter().enumerate() {
            match self.combiner.combine(scene, &group.instances, self.anchor) {
                Ok(batch) => report.batches.push(batch),
                Err(source) => {
                    log::error!("Static batching failed on group {index}: {source}");
                    self.restore_meshes(scene);
                    discard_batches(scene, &report.batches);
                    self.state = BatcherState::Idle;
                    return Err(BatcherError::Combine { group: index, source });
                }
            }
        }

        if self.config.verify_batch_membership {
            self.verify_membership(scene, &mut report);
        }

        self.state = BatcherState::Batched;
        log::info!(
            "Static batching: {} of {} candidate(s) merged into {} batch(es)",
            report.batched_instances(),
            report.candidates,
            report.batch_count()
        );
        Ok(report)
    }

    /// Point every batched renderer back at its original mesh
    ///
    /// Engine-side batch registration is left as is. Without a recorded pass
    /// this is a no-op. Returns the number of renderers restored.
    pub fn unbatch(&mut self, scene: &mut Scene) -> usize {
        let restored = self.restore_meshes(scene);
        self.state = BatcherState::Idle;
        if restored > 0 {
            log::info!("Static batching reverted for {restored} renderer(s)");
        }
        restored
    }

    fn restore_meshes(&mut self, scene: &mut Scene) -> usize {
        let mut restored = 0;
        for entry in self.restore_map.entries() {
            match scene.set_mesh_source(entry.renderer, entry.original) {
                Ok(_) => restored += 1,
                Err(e) => log::warn!("Could not restore original mesh: {e}"),
            }
        }
        self.restore_map.clear();
        restored
    }

    fn verify_membership(&self, scene: &Scene, report: &mut BatchReport) {
        for entry in self.restore_map.entries() {
            if !self.probe.is_statically_batched(scene, entry.renderer) {
                log::warn!(
                    "Renderer {:?} was merged but is not reported as part of a static batch",
                    entry.renderer
                );
                report
                    .advisories
                    .push(Advisory::MembershipMismatch { renderer: entry.renderer });
            }
        }
    }
}

/// Clear batch registration written by `batches` and drop their geometry
fn discard_batches(scene: &mut Scene, batches: &[CombinedBatch]) {
    for batch in batches {
        for member in &batch.members {
            if let Some(renderer) = scene.renderer_mut(member.renderer) {
                if renderer.static_batch.is_some_and(|info| info.geometry == batch.geometry) {
                    renderer.static_batch = None;
                }
            }
        }
        scene.remove_geometry(batch.geometry);
    }
    if !batches.is_empty() {
        log::debug!("Discarded {} partially merged batch(es)", batches.len());
    }
}

impl<C: MeshCombiner, P: EngineStateProbe> std::fmt::Debug for StaticBatcher<C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticBatcher")
            .field("anchor", &self.anchor)
            .field("state", &self.state)
            .field("restore_entries", &self.restore_map.len())
            .finish_non_exhaustive()
    }
}
