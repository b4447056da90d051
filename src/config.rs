//! Engine and namespace settings.
use serde::{Deserialize, Serialize};

/// How a raw scalar is checked against a declared primitive kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveMode {
    /// Reject scalars whose kind differs from the declaration.
    #[default]
    Strict,
    /// Carry mismatched scalars through untouched as `Data::Opaque`.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub primitives: PrimitiveMode,
    /// Keep discovered schemas per record name for the namespace's lifetime.
    pub cache_schemas: bool,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primitives: PrimitiveMode::Strict,
            cache_schemas: true,
            max_depth: 128,
        }
    }
}

impl Config {
    pub fn from_json_str(src: &str) -> Result<Self, String> {
        crate::path_de::from_str_with_path(src)
    }
}
