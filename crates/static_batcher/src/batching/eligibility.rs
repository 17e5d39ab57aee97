//! Per-instance eligibility for static batching
//!
//! Checks run in a fixed order and stop at the first rejection:
//!
//! 1. layer mask
//! 2. empty geometry
//! 3. unreadable geometry
//! 4. negative scale (warning only)
//! 5. missing or disabled renderer
//! 6. deep checks, when enabled: already batched, shader forbids batching
//!
//! Rejections only drop the instance from the current pass.

use super::probe::EngineStateProbe;
use crate::config::BatcherConfig;
use crate::scene::{LayerMask, MeshInstance, Scene};

/// Why an instance was left out of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum RejectReason {
    /// Node layer not in the include mask
    #[error("layer-excluded")]
    LayerExcluded,

    /// Geometry has no vertices
    #[error("empty-mesh")]
    EmptyMesh,

    /// Geometry vertex data is not CPU readable
    #[error("unreadable-mesh")]
    UnreadableMesh,

    /// No renderer, or the renderer is disabled
    #[error("no-active-renderer")]
    NoActiveRenderer,

    /// Renderer already belongs to a static batch
    #[error("already-batched")]
    AlreadyBatched,

    /// A material's shader forbids batching
    #[error("batching-disabled-by-shader")]
    BatchingDisabledByShader,
}

/// Outcome of evaluating one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Instance may be batched
    Accept {
        /// A negative-scale warning was raised for this instance
        negative_scale: bool,
    },
    /// Instance is skipped for this pass
    Reject(RejectReason),
}

impl Verdict {
    /// Whether the instance was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }
}

/// Eligibility predicate configured from a [`BatcherConfig`]
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter {
    include_layers: LayerMask,
    use_deep_checks: bool,
    warn_on_negative_scale: bool,
}

impl EligibilityFilter {
    /// Build the filter from batcher options
    pub fn new(config: &BatcherConfig) -> Self {
        Self {
            include_layers: config.include_layers,
            use_deep_checks: config.use_deep_eligibility_checks,
            warn_on_negative_scale: config.warn_on_negative_scale,
        }
    }

    /// Evaluate one instance
    pub fn evaluate<P: EngineStateProbe + ?Sized>(
        &self,
        scene: &Scene,
        probe: &P,
        instance: &MeshInstance,
    ) -> Verdict {
        if !self.include_layers.includes(instance.layer) {
            return Verdict::Reject(RejectReason::LayerExcluded);
        }

        if instance.vertex_count == 0 {
            log::warn!("'{}': trying to static batch a mesh with 0 vertices", instance.name);
            return Verdict::Reject(RejectReason::EmptyMesh);
        }

        if !instance.readable {
            log::warn!("'{}': trying to static batch non-readable geometry", instance.name);
            return Verdict::Reject(RejectReason::UnreadableMesh);
        }

        let negative_scale = self.warn_on_negative_scale && instance.has_negative_scale();
        if negative_scale {
            log::warn!(
                "'{}': negative scaling splits the merged geometry into an extra draw batch",
                instance.name
            );
        }

        let renderer = match &instance.renderer {
            Some(renderer) if renderer.enabled => renderer,
            _ => {
                log::warn!("'{}': mesh has no renderer or its renderer is disabled", instance.name);
                return Verdict::Reject(RejectReason::NoActiveRenderer);
            }
        };

        if self.use_deep_checks {
            if probe.is_statically_batched(scene, renderer.id) {
                log::info!("'{}': renderer is already statically batched", instance.name);
                return Verdict::Reject(RejectReason::AlreadyBatched);
            }

            let disabled = renderer
                .materials
                .iter()
                .flatten()
                .filter_map(|&material| scene.material(material))
                .filter_map(|material| material.shader)
                .any(|shader| probe.shader_disables_batching(scene, shader));
            if disabled {
                log::info!(
                    "'{}': renderer has a material whose shader disables batching",
                    instance.name
                );
                return Verdict::Reject(RejectReason::BatchingDisabledByShader);
            }
        }

        Verdict::Accept { negative_scale }
    }
}
