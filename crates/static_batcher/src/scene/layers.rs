//! Render layer mask used to include or exclude nodes from batching
//!
//! Every node sits on exactly one layer in `0..=31`. A [`LayerMask`] selects a
//! set of layers; a node is selected when the bit for its layer is set.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Highest valid layer index
pub const MAX_LAYER: u8 = 31;

bitflags::bitflags! {
    /// Set of render layers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        /// Engine default layer
        const DEFAULT = 1 << 0;
        /// Transparent effects layer
        const TRANSPARENT_FX = 1 << 1;
        /// Layer ignored by raycasts
        const IGNORE_RAYCAST = 1 << 2;
        /// Water surfaces
        const WATER = 1 << 4;
        /// User interface
        const UI = 1 << 5;
        /// Every layer
        const ALL = u32::MAX;
    }
}

impl LayerMask {
    /// Mask containing a single layer; empty for layers above [`MAX_LAYER`]
    pub fn layer(layer: u8) -> Self {
        1u32.checked_shl(u32::from(layer))
            .map_or_else(Self::empty, Self::from_bits_retain)
    }

    /// Mask built from several layer indices
    pub fn from_layers(layers: &[u8]) -> Self {
        layers.iter().fold(Self::empty(), |acc, &layer| acc | Self::layer(layer))
    }

    /// Check whether the bit for `layer` is set
    pub fn includes(self, layer: u8) -> bool {
        let bit = Self::layer(layer);
        !bit.is_empty() && self.intersects(bit)
    }

    /// Same mask with `layer` removed
    pub fn without(self, layer: u8) -> Self {
        self.difference(Self::layer(layer))
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

// Serialized as raw bits so masks survive round trips through config files
// even when they contain unnamed layers.
impl Serialize for LayerMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for LayerMask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_bits_retain)
    }
}
