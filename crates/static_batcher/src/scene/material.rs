//! Materials and the shaders they reference

use crate::foundation::collections::ShaderId;
use std::collections::HashMap;

/// Shader tag that controls whether batching may merge geometry drawn with it
pub const DISABLE_BATCHING_TAG: &str = "DisableBatching";

/// Shader program description
///
/// Only the tag block matters to batching. A shader that animates vertices in
/// object space sets `DisableBatching` so merging does not bake its transform.
#[derive(Debug, Clone, Default)]
pub struct Shader {
    /// Shader name
    pub name: String,

    /// Tag block (key/value pairs)
    pub tags: HashMap<String, String>,
}

impl Shader {
    /// Create a shader with no tags
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: HashMap::new(),
        }
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether the tag block forbids batching
    ///
    /// Any value except `False` (case-insensitive) disables it; `LODFading`
    /// counts as disabled too.
    pub fn disables_batching(&self) -> bool {
        self.tags
            .get(DISABLE_BATCHING_TAG)
            .is_some_and(|value| !value.trim().eq_ignore_ascii_case("false"))
    }
}

/// Material referencing an optional shader
#[derive(Debug, Clone, Default)]
pub struct Material {
    /// Material name
    pub name: String,

    /// Shader used to draw this material, if assigned
    pub shader: Option<ShaderId>,
}

impl Material {
    /// Create a material using `shader`
    pub fn new(name: impl Into<String>, shader: Option<ShaderId>) -> Self {
        Self {
            name: name.into(),
            shader,
        }
    }
}
