//! In-memory scene store
//!
//! Owns nodes, geometry, materials, shaders and renderers in slot maps and
//! answers the lookups the batcher needs: hierarchy traversal in a stable
//! order, world transforms, and reading/writing a renderer's mesh source.

use super::geometry::Geometry;
use super::instance::{MeshInstance, RendererState};
use super::material::{Material, Shader};
use super::renderer::MeshRenderer;
use crate::foundation::collections::{
    GeometryId, HandleMap, MaterialId, NodeId, RendererId, ShaderId,
};
use crate::foundation::math::Mat4;
use thiserror::Error;

/// Scene mutation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Node handle does not resolve
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Renderer handle does not resolve
    #[error("Renderer not found: {0:?}")]
    RendererNotFound(RendererId),

    /// Node already carries a renderer
    #[error("Node {0:?} already has a renderer")]
    RendererExists(NodeId),
}

/// A node in the scene hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Node name
    pub name: String,

    /// Parent node, `None` for roots
    pub parent: Option<NodeId>,

    /// Children in insertion order
    pub children: Vec<NodeId>,

    /// Render layer (0..=31)
    pub layer: u8,

    /// Transform relative to the parent
    pub local_transform: Mat4,

    /// Mesh assigned to this node, if it carries one
    pub mesh: Option<GeometryId>,

    /// Renderer attached to this node
    pub renderer: Option<RendererId>,
}

impl SceneNode {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            layer: 0,
            local_transform: Mat4::identity(),
            mesh: None,
            renderer: None,
        }
    }
}

/// Scene resources and hierarchy
#[derive(Debug, Default)]
pub struct Scene {
    nodes: HandleMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    geometries: HandleMap<GeometryId, Geometry>,
    materials: HandleMap<MaterialId, Material>,
    shaders: HandleMap<ShaderId, Shader>,
    renderers: HandleMap<RendererId, MeshRenderer>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node under `parent` (or as a root)
    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, SceneError> {
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(SceneError::NodeNotFound(parent));
            }
        }

        let id = self.nodes.insert(SceneNode::new(name.into(), parent));
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Register a geometry resource
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.insert(geometry)
    }

    /// Drop a geometry resource
    ///
    /// Nodes still pointing at it keep a dangling reference.
    pub fn remove_geometry(&mut self, id: GeometryId) -> Option<Geometry> {
        self.geometries.remove(id)
    }

    /// Register a shader
    pub fn add_shader(&mut self, shader: Shader) -> ShaderId {
        self.shaders.insert(shader)
    }

    /// Register a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    /// Attach a renderer to `node`
    pub fn add_renderer(
        &mut self,
        node: NodeId,
        materials: Vec<Option<MaterialId>>,
    ) -> Result<RendererId, SceneError> {
        let scene_node = self.nodes.get(node).ok_or(SceneError::NodeNotFound(node))?;
        if scene_node.renderer.is_some() {
            return Err(SceneError::RendererExists(node));
        }

        let id = self.renderers.insert(MeshRenderer::new(node, materials));
        if let Some(scene_node) = self.nodes.get_mut(node) {
            scene_node.renderer = Some(id);
        }
        Ok(id)
    }

    /// Detach and drop a renderer
    pub fn remove_renderer(&mut self, renderer: RendererId) -> Option<MeshRenderer> {
        let removed = self.renderers.remove(renderer)?;
        if let Some(node) = self.nodes.get_mut(removed.node) {
            node.renderer = None;
        }
        Some(removed)
    }

    /// Assign the mesh carried by `node`
    pub fn set_mesh(&mut self, node: NodeId, geometry: GeometryId) -> Result<(), SceneError> {
        let scene_node = self.nodes.get_mut(node).ok_or(SceneError::NodeNotFound(node))?;
        scene_node.mesh = Some(geometry);
        Ok(())
    }

    /// Set a node's layer
    pub fn set_layer(&mut self, node: NodeId, layer: u8) -> Result<(), SceneError> {
        let scene_node = self.nodes.get_mut(node).ok_or(SceneError::NodeNotFound(node))?;
        scene_node.layer = layer;
        Ok(())
    }

    /// Set a node's transform relative to its parent
    pub fn set_local_transform(&mut self, node: NodeId, transform: Mat4) -> Result<(), SceneError> {
        let scene_node = self.nodes.get_mut(node).ok_or(SceneError::NodeNotFound(node))?;
        scene_node.local_transform = transform;
        Ok(())
    }

    /// Get a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Get a geometry
    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    /// Get a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Get a shader
    pub fn shader(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id)
    }

    /// Get a renderer
    pub fn renderer(&self, id: RendererId) -> Option<&MeshRenderer> {
        self.renderers.get(id)
    }

    /// Get a renderer mutably
    pub fn renderer_mut(&mut self, id: RendererId) -> Option<&mut MeshRenderer> {
        self.renderers.get_mut(id)
    }

    /// Number of registered geometries
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Local-to-world transform of a node
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(id)?;
        let mut transform = node.local_transform;
        while let Some(parent) = node.parent {
            node = self.nodes.get(parent)?;
            transform = node.local_transform * transform;
        }
        Some(transform)
    }

    /// Mesh currently drawn by a renderer
    pub fn mesh_source(&self, renderer: RendererId) -> Option<GeometryId> {
        let renderer = self.renderers.get(renderer)?;
        self.nodes.get(renderer.node)?.mesh
    }

    /// Point a renderer at a different mesh, returning the previous one
    pub fn set_mesh_source(
        &mut self,
        renderer: RendererId,
        geometry: GeometryId,
    ) -> Result<Option<GeometryId>, SceneError> {
        let node = self
            .renderers
            .get(renderer)
            .ok_or(SceneError::RendererNotFound(renderer))?
            .node;
        let scene_node = self.nodes.get_mut(node).ok_or(SceneError::NodeNotFound(node))?;
        Ok(scene_node.mesh.replace(geometry))
    }

    /// `root` and all its descendants, depth-first pre-order
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            ordered.push(id);
            // Reverse so the first child is visited first
            stack.extend(node.children.iter().rev().copied());
        }
        ordered
    }

    /// Every node, roots in creation order, each tree depth-first pre-order
    pub fn all_nodes(&self) -> Vec<NodeId> {
        self.roots.iter().flat_map(|&root| self.subtree(root)).collect()
    }

    /// Snapshot every mesh-carrying node in the search scope
    ///
    /// With `global` false only `anchor` and its descendants are visited. The
    /// order is stable for an unchanged scene, which keeps batch boundaries
    /// reproducible.
    pub fn mesh_instances(&self, anchor: NodeId, global: bool) -> Vec<MeshInstance> {
        let nodes = if global { self.all_nodes() } else { self.subtree(anchor) };
        nodes
            .into_iter()
            .filter_map(|id| self.capture_instance(id))
            .collect()
    }

    /// Snapshot one node, `None` if it carries no mesh
    pub fn capture_instance(&self, id: NodeId) -> Option<MeshInstance> {
        let node = self.nodes.get(id)?;
        let geometry = node.mesh?;
        let (vertex_count, readable) = self
            .geometries
            .get(geometry)
            .map_or((0, false), |g| (g.vertex_count(), g.readable));

        let renderer = node
            .renderer
            .and_then(|rid| self.renderers.get(rid).map(|r| (rid, r)))
            .map(|(rid, r)| RendererState {
                id: rid,
                enabled: r.enabled,
                materials: r.materials.clone(),
            });

        Some(MeshInstance {
            node: id,
            name: node.name.clone(),
            layer: node.layer,
            world_transform: self.world_transform(id)?,
            geometry,
            vertex_count,
            readable,
            renderer,
        })
    }
}
