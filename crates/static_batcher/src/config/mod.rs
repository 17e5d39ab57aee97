//! Configuration system
//!
//! [`BatcherConfig`] holds every option of a batcher instance. It is fixed at
//! construction; changing the scene's layering or the anchor between a batch
//! and its reversal is the caller's responsibility.

use crate::scene::LayerMask;
pub use serde::{Deserialize, Serialize};

/// Default vertex budget per merged batch
///
/// Keeps combined vertex indices inside a 16-bit index buffer.
pub const DEFAULT_VERTEX_BUDGET: u32 = 64_000;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// When a batcher runs its first pass on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationMode {
    /// Only when `batch()` is called explicitly
    Manual,
    /// As soon as the owning object is created
    OnCreate,
    /// When the owning object is first activated
    #[default]
    OnActivate,
}

/// Options for one batcher instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Lifecycle point that triggers the first pass
    pub initialization_mode: InitializationMode,

    /// Search the whole scene instead of the anchor's subtree
    pub is_global: bool,

    /// Layers whose nodes may be batched
    pub include_layers: LayerMask,

    /// Also reject already-batched renderers and shaders that forbid batching
    pub use_deep_eligibility_checks: bool,

    /// Log a warning for mirrored (negative determinant) transforms
    pub warn_on_negative_scale: bool,

    /// Maximum vertex total per merged batch
    pub vertex_budget: u32,

    /// Check every merged renderer reports static batch membership afterwards
    pub verify_batch_membership: bool,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            initialization_mode: InitializationMode::default(),
            is_global: false,
            include_layers: LayerMask::ALL,
            use_deep_eligibility_checks: true,
            warn_on_negative_scale: true,
            vertex_budget: DEFAULT_VERTEX_BUDGET,
            verify_batch_membership: true,
        }
    }
}

impl Config for BatcherConfig {}

impl BatcherConfig {
    /// Configuration for explicit `batch()` calls only
    pub fn manual() -> Self {
        Self {
            initialization_mode: InitializationMode::Manual,
            ..Self::default()
        }
    }

    /// Set the vertex budget
    #[must_use]
    pub fn with_vertex_budget(mut self, vertex_budget: u32) -> Self {
        self.vertex_budget = vertex_budget;
        self
    }

    /// Set the included layers
    #[must_use]
    pub fn with_layers(mut self, include_layers: LayerMask) -> Self {
        self.include_layers = include_layers;
        self
    }

    /// Enable or disable the deep eligibility checks
    #[must_use]
    pub fn with_deep_checks(mut self, enabled: bool) -> Self {
        self.use_deep_eligibility_checks = enabled;
        self
    }

    /// Search the whole scene instead of the anchor's subtree
    #[must_use]
    pub fn global(mut self, is_global: bool) -> Self {
        self.is_global = is_global;
        self
    }

    /// Validate values that deserialize fine but cannot drive a pass
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vertex_budget == 0 {
            return Err(ConfigError::Invalid("vertex_budget must be greater than zero".to_string()));
        }
        if self.include_layers.is_empty() {
            log::warn!("include_layers is empty; no node will ever be batched");
        }
        Ok(())
    }
}
