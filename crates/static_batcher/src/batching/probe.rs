//! Queries against engine-side state the scene model does not expose directly
//!
//! Whether a renderer already belongs to a static batch and whether a shader
//! forbids batching are owned by the engine. The batcher asks through
//! [`EngineStateProbe`] so hosts can answer from their own bookkeeping and
//! tests can substitute fakes.

use crate::foundation::collections::{RendererId, ShaderId};
use crate::scene::Scene;

/// Boolean queries about engine-owned batching state
pub trait EngineStateProbe {
    /// Whether `renderer` is registered in a static batch
    fn is_statically_batched(&self, scene: &Scene, renderer: RendererId) -> bool;

    /// Whether `shader` disables batching for anything drawn with it
    fn shader_disables_batching(&self, scene: &Scene, shader: ShaderId) -> bool;
}

/// Probe reading the flags stored in the [`Scene`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneStateProbe;

impl EngineStateProbe for SceneStateProbe {
    fn is_statically_batched(&self, scene: &Scene, renderer: RendererId) -> bool {
        scene
            .renderer(renderer)
            .is_some_and(crate::scene::MeshRenderer::is_statically_batched)
    }

    fn shader_disables_batching(&self, scene: &Scene, shader: ShaderId) -> bool {
        scene
            .shader(shader)
            .is_some_and(crate::scene::Shader::disables_batching)
    }
}
