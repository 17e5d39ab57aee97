//! Batching scenarios covering filtering, partitioning, merging and reversal

use crate::batching::{
    Advisory, BatcherError, BatcherState, CombineError, CombineResult, CombinedBatch,
    CpuMeshCombiner, EngineStateProbe, MeshCombiner, RejectReason, StaticBatcher,
};
use crate::config::BatcherConfig;
use crate::foundation::collections::{GeometryId, NodeId, RendererId, ShaderId};
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::{
    Geometry, LayerMask, Material, MeshInstance, Scene, Shader, DISABLE_BATCHING_TAG,
};

/// Scene with one anchor; members are added under it
struct TestScene {
    scene: Scene,
    anchor: NodeId,
}

impl TestScene {
    fn new() -> Self {
        let mut scene = Scene::new();
        let anchor = scene.create_node("anchor", None).unwrap();
        Self { scene, anchor }
    }

    fn add(&mut self, name: &str, geometry: GeometryId) -> (NodeId, RendererId) {
        let node = self.scene.create_node(name, Some(self.anchor)).unwrap();
        self.scene.set_mesh(node, geometry).unwrap();
        let renderer = self.scene.add_renderer(node, Vec::new()).unwrap();
        (node, renderer)
    }

    fn add_points(&mut self, name: &str, vertices: usize) -> (NodeId, RendererId) {
        let geometry = self
            .scene
            .add_geometry(Geometry::point_cloud(format!("{name}-mesh"), vertices));
        self.add(name, geometry)
    }

    fn batch_disabling_shader(&mut self) -> ShaderId {
        self.scene
            .add_shader(Shader::new("Foliage").with_tag(DISABLE_BATCHING_TAG, "True"))
    }
}

fn member_names(scene: &Scene, batch: &CombinedBatch) -> Vec<String> {
    batch
        .members
        .iter()
        .map(|m| scene.node(m.node).unwrap().name.clone())
        .collect()
}

fn manual() -> BatcherConfig {
    BatcherConfig::manual()
}

#[test]
fn test_three_small_instances_share_one_batch() {
    let mut ts = TestScene::new();
    for name in ["inst1", "inst2", "inst3"] {
        ts.add_points(name, 20_000);
    }

    let mut batcher = StaticBatcher::new(manual(), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    assert_eq!(report.batch_count(), 1);
    assert_eq!(member_names(&ts.scene, &report.batches[0]), vec!["inst1", "inst2", "inst3"]);
    let combined = ts.scene.geometry(report.batches[0].geometry).unwrap();
    assert_eq!(combined.vertex_count(), 60_000);
}

#[test]
fn test_budget_overflow_splits_batches() {
    let mut ts = TestScene::new();
    ts.add_points("inst1", 40_000);
    ts.add_points("inst2", 40_000);
    ts.add_points("inst3", 1);

    let mut batcher = StaticBatcher::new(manual(), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    assert_eq!(report.batch_count(), 2);
    assert_eq!(member_names(&ts.scene, &report.batches[0]), vec!["inst1"]);
    assert_eq!(member_names(&ts.scene, &report.batches[1]), vec!["inst2", "inst3"]);
    assert!(report.advisories.iter().any(
        |a| matches!(a, Advisory::VertexLimitBreak { name, .. } if name == "inst2")
    ));
}

#[test]
fn test_lone_empty_mesh_yields_no_batches() {
    let mut ts = TestScene::new();
    let empty = ts.scene.add_geometry(Geometry::new("empty", Vec::new(), Vec::new()));
    ts.add("empty", empty);

    let mut batcher = StaticBatcher::new(manual(), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.batch_count(), 0);
    assert_eq!(report.rejections(RejectReason::EmptyMesh), 1);
    assert!(batcher.restore_map().is_empty());
}

#[test]
fn test_excluded_layer_rejected_regardless_of_validity() {
    let mut ts = TestScene::new();
    let (node, _) = ts.add_points("layer5", 10);
    ts.scene.set_layer(node, 5).unwrap();
    ts.add_points("layer0", 10);

    let config = manual().with_layers(LayerMask::ALL.without(5));
    let mut batcher = StaticBatcher::new(config, ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    assert_eq!(report.rejections(RejectReason::LayerExcluded), 1);
    assert_eq!(report.batched_instances(), 1);
    assert_eq!(member_names(&ts.scene, &report.batches[0]), vec!["layer0"]);
}

#[test]
fn test_shader_flag_ignored_without_deep_checks() {
    let mut ts = TestScene::new();
    let shader = ts.batch_disabling_shader();
    let material = ts.scene.add_material(Material::new("leaves", Some(shader)));
    let (_, renderer) = ts.add_points("tree", 10);
    ts.scene.renderer_mut(renderer).unwrap().materials = vec![Some(material)];

    let mut shallow = StaticBatcher::new(manual().with_deep_checks(false), ts.anchor).unwrap();
    let report = shallow.batch(&mut ts.scene).unwrap();
    assert_eq!(report.batched_instances(), 1);
    shallow.unbatch(&mut ts.scene);

    // Engine-side registration from the first pass persists; reset it so only
    // the shader flag differs.
    ts.scene.renderer_mut(renderer).unwrap().static_batch = None;
    let mut deep = StaticBatcher::new(manual(), ts.anchor).unwrap();
    let report = deep.batch(&mut ts.scene).unwrap();
    assert_eq!(report.batched_instances(), 0);
    assert_eq!(report.rejections(RejectReason::BatchingDisabledByShader), 1);
}

#[test]
fn test_batch_then_unbatch_restores_every_mesh() {
    let mut ts = TestScene::new();
    let shared = ts.scene.add_geometry(Geometry::cube("shared"));
    let mut renderers = Vec::new();
    for i in 0..5 {
        renderers.push(ts.add(&format!("shared{i}"), shared).1);
    }
    renderers.push(ts.add_points("unique", 100).1);
    let originals: Vec<_> = renderers.iter().map(|&r| ts.scene.mesh_source(r)).collect();

    let mut batcher = StaticBatcher::new(manual().with_vertex_budget(20), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();
    assert!(report.batch_count() > 1);
    for &renderer in &renderers {
        assert_ne!(ts.scene.mesh_source(renderer), Some(shared));
    }

    assert_eq!(batcher.unbatch(&mut ts.scene), renderers.len());
    let restored: Vec<_> = renderers.iter().map(|&r| ts.scene.mesh_source(r)).collect();
    assert_eq!(restored, originals);
}

#[test]
fn test_rebatch_while_batched_is_refused() {
    let mut ts = TestScene::new();
    let (_, renderer) = ts.add_points("a", 10);
    ts.add_points("b", 10);

    let mut batcher = StaticBatcher::new(manual(), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();
    let combined = report.batches[0].geometry;
    let map_before = batcher.restore_map().clone();

    assert!(matches!(batcher.batch(&mut ts.scene), Err(BatcherError::AlreadyBatched)));
    assert_eq!(batcher.state(), BatcherState::Batched);
    assert_eq!(batcher.restore_map(), &map_before);
    assert_eq!(ts.scene.mesh_source(renderer), Some(combined));
}

#[test]
fn test_rebatch_after_unbatch_sees_engine_registration() {
    let mut ts = TestScene::new();
    ts.add_points("a", 10);
    ts.add_points("b", 10);

    let mut batcher = StaticBatcher::new(manual(), ts.anchor).unwrap();
    batcher.batch(&mut ts.scene).unwrap();
    batcher.unbatch(&mut ts.scene);

    let report = batcher.batch(&mut ts.scene).unwrap();
    assert_eq!(report.batched_instances(), 0);
    assert_eq!(report.rejections(RejectReason::AlreadyBatched), 2);
}

#[test]
fn test_one_bad_instance_does_not_block_others() {
    let mut ts = TestScene::new();
    let gpu_only = ts.scene.add_geometry(Geometry::cube("gpu").unreadable());
    ts.add_points("good1", 10);
    ts.add("unreadable", gpu_only);
    let (_, disabled) = ts.add_points("disabled", 10);
    ts.scene.renderer_mut(disabled).unwrap().enabled = false;
    let bare = ts.scene.create_node("no-renderer", Some(ts.anchor)).unwrap();
    let cube = ts.scene.add_geometry(Geometry::cube("cube"));
    ts.scene.set_mesh(bare, cube).unwrap();
    ts.add_points("good2", 10);

    let mut batcher = StaticBatcher::new(manual(), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    assert_eq!(report.candidates, 5);
    assert_eq!(report.eligible, 2);
    assert_eq!(member_names(&ts.scene, &report.batches[0]), vec!["good1", "good2"]);
    assert_eq!(report.rejections(RejectReason::UnreadableMesh), 1);
    assert_eq!(report.rejections(RejectReason::NoActiveRenderer), 2);
}

#[test]
fn test_negative_scale_accepted_with_advisory() {
    let mut ts = TestScene::new();
    let (node, _) = ts.add_points("mirrored", 10);
    ts.scene
        .set_local_transform(node, Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 1.0, -1.0)))
        .unwrap();

    let mut batcher = StaticBatcher::new(manual(), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    assert_eq!(report.batched_instances(), 1);
    assert!(report
        .advisories
        .contains(&Advisory::NegativeScale { node, name: "mirrored".to_string() }));
    assert!(report.batches[0].members[0].mirrored);
}

#[test]
fn test_scope_subtree_versus_global() {
    let mut ts = TestScene::new();
    ts.add_points("inside", 10);
    let outside = ts.scene.create_node("outside", None).unwrap();
    let cube = ts.scene.add_geometry(Geometry::cube("cube"));
    ts.scene.set_mesh(outside, cube).unwrap();
    ts.scene.add_renderer(outside, Vec::new()).unwrap();

    let mut local = StaticBatcher::new(manual(), ts.anchor).unwrap();
    assert_eq!(local.batch(&mut ts.scene).unwrap().batched_instances(), 1);
    local.unbatch(&mut ts.scene);

    let mut ts = TestScene::new();
    ts.add_points("inside", 10);
    let outside = ts.scene.create_node("outside", None).unwrap();
    let cube = ts.scene.add_geometry(Geometry::cube("cube"));
    ts.scene.set_mesh(outside, cube).unwrap();
    ts.scene.add_renderer(outside, Vec::new()).unwrap();

    let mut global = StaticBatcher::new(manual().global(true), ts.anchor).unwrap();
    assert_eq!(global.batch(&mut ts.scene).unwrap().batched_instances(), 2);
}

/// Delegates to the CPU combiner but fails on one chosen call
struct FailingCombiner {
    inner: CpuMeshCombiner,
    fail_on_call: usize,
    calls: usize,
}

impl MeshCombiner for FailingCombiner {
    fn combine(
        &mut self,
        scene: &mut Scene,
        instances: &[MeshInstance],
        anchor: NodeId,
    ) -> CombineResult<CombinedBatch> {
        let call = self.calls;
        self.calls += 1;
        if call == self.fail_on_call {
            return Err(CombineError::MissingGeometry(instances[0].name.clone()));
        }
        self.inner.combine(scene, instances, anchor)
    }
}

/// Probe that never reports batch membership and never blocks shaders
struct AmnesicProbe;

impl EngineStateProbe for AmnesicProbe {
    fn is_statically_batched(&self, _scene: &Scene, _renderer: RendererId) -> bool {
        false
    }

    fn shader_disables_batching(&self, _scene: &Scene, _shader: ShaderId) -> bool {
        false
    }
}

#[test]
fn test_combiner_failure_restores_and_surfaces_error() {
    let mut ts = TestScene::new();
    let renderers: Vec<_> = (0..4).map(|i| ts.add_points(&format!("p{i}"), 10).1).collect();
    let originals: Vec<_> = renderers.iter().map(|&r| ts.scene.mesh_source(r)).collect();
    let geometries = ts.scene.geometry_count();

    let combiner = FailingCombiner { inner: CpuMeshCombiner::new(), fail_on_call: 1, calls: 0 };
    let mut batcher = StaticBatcher::with_capabilities(
        manual().with_vertex_budget(20),
        ts.anchor,
        combiner,
        crate::batching::SceneStateProbe,
    )
    .unwrap();

    let result = batcher.batch(&mut ts.scene);
    assert!(matches!(result, Err(BatcherError::Combine { group: 1, .. })));
    assert_eq!(batcher.state(), BatcherState::Idle);
    assert!(batcher.restore_map().is_empty());

    let current: Vec<_> = renderers.iter().map(|&r| ts.scene.mesh_source(r)).collect();
    assert_eq!(current, originals);

    // The group merged before the failure leaves nothing behind
    assert_eq!(ts.scene.geometry_count(), geometries);
    for &renderer in &renderers {
        assert!(!ts.scene.renderer(renderer).unwrap().is_statically_batched());
    }

    // Deep-checked retry merges every instance
    let report = batcher.batch(&mut ts.scene).unwrap();
    assert_eq!(report.rejections(RejectReason::AlreadyBatched), 0);
    assert_eq!(report.batched_instances(), 4);
    assert_eq!(report.batch_count(), 2);
    assert_eq!(batcher.state(), BatcherState::Batched);
}

#[test]
fn test_membership_mismatch_reported_not_fatal() {
    let mut ts = TestScene::new();
    let (_, a) = ts.add_points("a", 10);
    let (_, b) = ts.add_points("b", 10);

    let mut batcher =
        StaticBatcher::with_capabilities(manual(), ts.anchor, CpuMeshCombiner::new(), AmnesicProbe)
            .unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    assert_eq!(batcher.state(), BatcherState::Batched);
    let mismatches: Vec<_> = report
        .advisories
        .iter()
        .filter_map(|adv| match adv {
            Advisory::MembershipMismatch { renderer } => Some(*renderer),
            _ => None,
        })
        .collect();
    assert_eq!(mismatches, vec![a, b]);
}

#[test]
fn test_membership_check_can_be_disabled() {
    let mut ts = TestScene::new();
    ts.add_points("a", 10);

    let mut config = manual();
    config.verify_batch_membership = false;
    let mut batcher =
        StaticBatcher::with_capabilities(config, ts.anchor, CpuMeshCombiner::new(), AmnesicProbe)
            .unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();
    assert!(report.advisories.is_empty());
}

#[test]
fn test_oversized_instance_batched_alone() {
    let mut ts = TestScene::new();
    ts.add_points("small", 10);
    ts.add_points("huge", 200);
    ts.add_points("tail", 10);

    let mut batcher = StaticBatcher::new(manual().with_vertex_budget(100), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    let groups: Vec<_> = report.batches.iter().map(|b| member_names(&ts.scene, b)).collect();
    assert_eq!(groups, vec![vec!["small"], vec!["huge"], vec!["tail"]]);
    assert!(report
        .advisories
        .iter()
        .any(|a| matches!(a, Advisory::OversizedInstance { .. })));
}

#[test]
fn test_batches_partition_eligible_in_order() {
    let counts = [30, 45, 10, 80, 5, 5, 60, 40, 99, 1, 50, 50];
    let mut ts = TestScene::new();
    let mut expected = Vec::new();
    for (i, &count) in counts.iter().enumerate() {
        let name = format!("n{i}");
        let (node, renderer) = ts.add_points(&name, count);
        // Every third instance is disabled and must drop out
        if i % 3 == 2 {
            ts.scene.renderer_mut(renderer).unwrap().enabled = false;
        } else {
            expected.push((node, count));
        }
    }

    let mut batcher = StaticBatcher::new(manual().with_vertex_budget(100), ts.anchor).unwrap();
    let report = batcher.batch(&mut ts.scene).unwrap();

    let flattened: Vec<_> = report
        .batches
        .iter()
        .flat_map(|b| b.members.iter().map(|m| m.node))
        .collect();
    let expected_nodes: Vec<_> = expected.iter().map(|(n, _)| *n).collect();
    assert_eq!(flattened, expected_nodes);

    for batch in &report.batches {
        let vertices = ts.scene.geometry(batch.geometry).unwrap().vertex_count();
        assert!(vertices <= 100 || batch.members.len() == 1);
    }
}
