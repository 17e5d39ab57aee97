//! Handle types for scene resources
//!
//! Every resource the batcher touches lives in a slot map owned by the
//! [`Scene`](crate::scene::Scene) and is referenced by a typed key. Keys are
//! `Copy`, compare by identity and stay valid until the resource is removed.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a node in the scene hierarchy
    pub struct NodeId;

    /// Handle to a shared, immutable geometry resource
    pub struct GeometryId;

    /// Handle to a material
    pub struct MaterialId;

    /// Handle to a shader
    pub struct ShaderId;

    /// Handle to a mesh renderer component
    pub struct RendererId;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<K, T> = SlotMap<K, T>;
