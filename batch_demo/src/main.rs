//! Static Batching Demo
//!
//! Builds a small city block of static props, batches it, prints what
//! happened and reverts the batch:
//! - Buildings sharing one cube mesh, a few of them mirrored
//! - Trees whose foliage shader disables batching
//! - A UI-layer billboard excluded by the layer mask
//! - GPU-only terrain that cannot be merged
//!
//! Usage: `batch_demo [config.toml|config.ron]`

use static_batcher::batching::{Advisory, BatchReport};
use static_batcher::foundation::logging;
use static_batcher::foundation::math::trs;
use static_batcher::prelude::*;
use static_batcher::scene::DISABLE_BATCHING_TAG;
use std::f32::consts::FRAC_PI_2;

// Scene layout
const BUILDING_ROWS: usize = 4;
const BUILDINGS_PER_ROW: usize = 6;
const BUILDING_SPACING: f32 = 12.0;
const TREE_COUNT: usize = 5;
const UI_LAYER: u8 = 5;

type DemoResult<T> = Result<T, Box<dyn std::error::Error>>;

fn build_city_block(scene: &mut Scene) -> DemoResult<NodeId> {
    let standard = scene.add_shader(Shader::new("Standard"));
    let foliage = scene.add_shader(Shader::new("Foliage").with_tag(DISABLE_BATCHING_TAG, "True"));
    let brick = scene.add_material(Material::new("Brick", Some(standard)));
    let glass = scene.add_material(Material::new("Glass", Some(standard)));
    let leaves = scene.add_material(Material::new("Leaves", Some(foliage)));

    let building = scene.add_geometry(Geometry::cube("Building"));
    let canopy = scene.add_geometry(Geometry::cube("Canopy"));
    let sign = scene.add_geometry(Geometry::quad("Billboard"));
    let terrain = scene.add_geometry(Geometry::quad("Terrain").unreadable());

    let block = scene.create_node("CityBlock", None)?;

    for row in 0..BUILDING_ROWS {
        for column in 0..BUILDINGS_PER_ROW {
            let node = scene.create_node(format!("Building_{row}_{column}"), Some(block))?;
            #[allow(clippy::cast_precision_loss)]
            let position = Vec3::new(column as f32 * BUILDING_SPACING, 0.0, row as f32 * BUILDING_SPACING);
            // Every fifth building is a mirrored copy
            let mirror = if (row * BUILDINGS_PER_ROW + column) % 5 == 0 { -1.0 } else { 1.0 };
            let yaw = if column % 2 == 0 { 0.0 } else { FRAC_PI_2 };
            scene.set_local_transform(node, trs(position, yaw, Vec3::new(4.0 * mirror, 8.0, 4.0)))?;
            scene.set_mesh(node, building)?;
            scene.add_renderer(node, vec![Some(brick), Some(glass)])?;
        }
    }

    for i in 0..TREE_COUNT {
        let node = scene.create_node(format!("Tree_{i}"), Some(block))?;
        #[allow(clippy::cast_precision_loss)]
        let x = i as f32 * 15.0;
        scene.set_local_transform(node, trs(Vec3::new(x, 0.0, -10.0), 0.0, Vec3::new(2.0, 2.0, 2.0)))?;
        scene.set_mesh(node, canopy)?;
        scene.add_renderer(node, vec![Some(leaves)])?;
    }

    let billboard = scene.create_node("Billboard", Some(block))?;
    scene.set_layer(billboard, UI_LAYER)?;
    scene.set_mesh(billboard, sign)?;
    scene.add_renderer(billboard, vec![Some(glass)])?;

    let ground = scene.create_node("Terrain", Some(block))?;
    scene.set_mesh(ground, terrain)?;
    scene.add_renderer(ground, vec![Some(brick)])?;

    Ok(block)
}

fn load_config() -> DemoResult<BatcherConfig> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading batcher configuration from {path}");
            BatcherConfig::load_from_file(&path)?
        }
        None => BatcherConfig {
            include_layers: LayerMask::ALL.without(UI_LAYER),
            ..BatcherConfig::default()
        },
    };
    Ok(config)
}

fn log_report(scene: &Scene, report: &BatchReport) {
    log::info!(
        "{} candidates, {} eligible, {} batch(es)",
        report.candidates,
        report.eligible,
        report.batch_count()
    );

    for batch in &report.batches {
        if let Some(geometry) = scene.geometry(batch.geometry) {
            log::info!(
                "  batch {}: {} members, {} vertices, {} submeshes",
                batch.batch_index,
                batch.members.len(),
                geometry.vertex_count(),
                geometry.submesh_count()
            );
        }
    }

    for advisory in &report.advisories {
        match advisory {
            Advisory::Rejected { name, reason, .. } => log::info!("  skipped {name}: {reason}"),
            Advisory::NegativeScale { name, .. } => log::info!("  mirrored {name}"),
            Advisory::VertexLimitBreak { name, .. } => log::info!("  new batch at {name}"),
            Advisory::OversizedInstance { node } => {
                log::info!("  oversized instance {node:?} batched alone");
            }
            Advisory::MembershipMismatch { renderer } => {
                log::warn!("  renderer {renderer:?} missing from its batch");
            }
        }
    }
}

fn main() -> DemoResult<()> {
    logging::init();

    let mut scene = Scene::new();
    let block = build_city_block(&mut scene)?;
    let config = load_config()?;
    log::debug!("Batcher configuration: {config:?}");

    let mut batcher = StaticBatcher::new(config, block)?;
    // Lifecycle hooks run first; manual mode falls through to an explicit pass
    let report = match batcher.on_create(&mut scene)? {
        Some(report) => report,
        None => match batcher.on_activate(&mut scene)? {
            Some(report) => report,
            None => batcher.batch(&mut scene)?,
        },
    };
    log_report(&scene, &report);

    let restored = batcher.unbatch(&mut scene);
    log::info!("Reverted {restored} renderer(s); batcher is {:?}", batcher.state());
    Ok(())
}
