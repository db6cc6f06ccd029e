//! Build options.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::pack::MAX_PACKED_WIDTH;
use crate::util::{Error, Result};

/// Tunables for a scene build. Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Top-level leaf capacity
    pub max_items_per_leaf: usize,
    /// Bottom-level leaf capacity
    pub blas_max_leaf_size: usize,
    /// SAH bins per axis for bottom-level builds
    pub blas_bins: usize,
    /// Run per-mesh and per-instance work on the rayon pool
    pub parallel: bool,
    /// Largest square texture side accepted for packed buffers
    pub max_texture_width: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_items_per_leaf: 1,
            blas_max_leaf_size: 4,
            blas_bins: 12,
            parallel: true,
            max_texture_width: MAX_PACKED_WIDTH,
        }
    }
}

impl BuildOptions {
    /// Reject values the builders cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_items_per_leaf == 0 {
            return Err(Error::config("max_items_per_leaf must be at least 1"));
        }
        if self.blas_max_leaf_size == 0 {
            return Err(Error::config("blas_max_leaf_size must be at least 1"));
        }
        if self.blas_bins < 2 {
            return Err(Error::config("blas_bins must be at least 2"));
        }
        if self.max_texture_width == 0 || self.max_texture_width > MAX_PACKED_WIDTH {
            return Err(Error::config(format!(
                "max_texture_width must be in 1..={MAX_PACKED_WIDTH}, got {}",
                self.max_texture_width
            )));
        }
        Ok(())
    }

    /// Parse and validate options from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load and validate options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
