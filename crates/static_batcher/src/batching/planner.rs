//! Vertex-budget partitioning of eligible instances
//!
//! One linear pass in enumeration order. A group closes when the next
//! instance would push it past the budget, so the same input always yields
//! the same boundaries. The restore map is recorded here, before any merge
//! rewrites a mesh reference.

use crate::foundation::collections::{GeometryId, NodeId, RendererId};
use crate::scene::MeshInstance;
use slotmap::SecondaryMap;

/// Instances merged into one combined geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGroup {
    /// Members in enumeration order
    pub instances: Vec<MeshInstance>,

    /// Sum of member vertex counts
    pub vertex_total: u64,
}

impl BatchGroup {
    /// Number of members
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn push(&mut self, instance: MeshInstance) {
        self.vertex_total += u64::from(instance.vertex_count);
        self.instances.push(instance);
    }
}

/// Original mesh of one batched renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreEntry {
    /// Renderer whose mesh source gets rewritten
    pub renderer: RendererId,

    /// Node carrying the renderer
    pub node: NodeId,

    /// Mesh assigned before batching
    pub original: GeometryId,
}

/// Original meshes of every renderer in a pass, in planning order
///
/// Entries replay in order; lookups by renderer go through a secondary map.
#[derive(Debug, Clone, Default)]
pub struct RestoreMap {
    entries: Vec<RestoreEntry>,
    by_renderer: SecondaryMap<RendererId, GeometryId>,
}

impl PartialEq for RestoreMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for RestoreMap {}

impl RestoreMap {
    /// Record one renderer's original mesh
    ///
    /// The first entry for a renderer wins. Returns whether it was recorded.
    pub fn record(&mut self, entry: RestoreEntry) -> bool {
        if self.contains(entry.renderer) {
            return false;
        }
        self.by_renderer.insert(entry.renderer, entry.original);
        self.entries.push(entry);
        true
    }

    /// Whether `renderer` already has an entry
    pub fn contains(&self, renderer: RendererId) -> bool {
        self.by_renderer.contains_key(renderer)
    }

    /// Original mesh recorded for `renderer`
    pub fn original(&self, renderer: RendererId) -> Option<GeometryId> {
        self.by_renderer.get(renderer).copied()
    }

    /// Recorded entries in planning order
    pub fn entries(&self) -> &[RestoreEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_renderer.clear();
    }
}

/// Point where the budget forced a new group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchBreak {
    /// Instance that did not fit
    pub node: NodeId,

    /// Name of that instance
    pub name: String,

    /// Vertex total of the group that was closed
    pub closed_total: u64,
}

/// Result of planning one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPlan {
    /// Groups in emission order, none empty
    pub groups: Vec<BatchGroup>,

    /// Original mesh per planned renderer
    pub restore_map: RestoreMap,

    /// Budget-driven group boundaries
    pub breaks: Vec<BatchBreak>,

    /// Instances whose own vertex count exceeds the budget
    pub oversized: Vec<NodeId>,
}

impl BatchPlan {
    /// Number of planned instances
    pub fn instance_count(&self) -> usize {
        self.groups.iter().map(BatchGroup::len).sum()
    }
}

/// Partition eligible instances into groups of at most `budget` vertices
///
/// Instances without a renderer are skipped: they cannot be merged or
/// restored, and the eligibility filter never lets them through.
///
/// An instance over the budget on its own closes no group, so it gets an
/// `oversized` entry instead of a [`BatchBreak`].
pub fn plan(candidates: Vec<MeshInstance>, budget: u32) -> BatchPlan {
    let budget = u64::from(budget);
    let mut result = BatchPlan::default();
    let mut current = BatchGroup::default();

    for instance in candidates {
        let Some(renderer) = instance.renderer_id() else {
            log::debug!("'{}': skipped by planner, no renderer", instance.name);
            continue;
        };
        if result.restore_map.contains(renderer) {
            log::warn!("'{}': renderer enumerated twice, keeping first occurrence", instance.name);
            continue;
        }
        let vertex_count = u64::from(instance.vertex_count);

        if current.vertex_total + vertex_count > budget {
            if current.is_empty() {
                log::warn!(
                    "'{}': {} vertices exceed the batch vertex budget of {} on their own",
                    instance.name,
                    vertex_count,
                    budget
                );
            } else {
                log::warn!(
                    "'{}': batch vertex limit reached at {} vertices, starting a new batch",
                    instance.name,
                    current.vertex_total
                );
                result.breaks.push(BatchBreak {
                    node: instance.node,
                    name: instance.name.clone(),
                    closed_total: current.vertex_total,
                });
                result.groups.push(std::mem::take(&mut current));
            }
        }
        if vertex_count > budget {
            result.oversized.push(instance.node);
        }

        result.restore_map.record(RestoreEntry {
            renderer,
            node: instance.node,
            original: instance.geometry,
        });
        current.push(instance);
    }

    if !current.is_empty() {
        result.groups.push(current);
    }

    log::debug!(
        "Planned {} instance(s) into {} batch(es)",
        result.instance_count(),
        result.groups.len()
    );
    result
}
