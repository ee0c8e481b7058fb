//! Crate Configuration — tunables shared by every fracture system
//!
//! Loadable from RON; out-of-range values are clamped at load time, never
//! rejected.

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Shared fracture-layer tunables.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct FractureLinkConfig {
    /// Upper bound on colliders gathered by one overlap query
    pub max_overlap_hits: usize,
    /// Chaos intensity used when a character carries no motion addon
    pub default_chaos: f32,
    /// Seed for the deterministic chaos RNG
    pub chaos_seed: u64,
}

impl Default for FractureLinkConfig {
    fn default() -> Self {
        Self { max_overlap_hits: 256, default_chaos: 0.5, chaos_seed: 0x5eed_f0c5 }
    }
}

impl FractureLinkConfig {
    /// Clamp every field into its valid range. Idempotent.
    pub fn validate(&mut self) {
        self.max_overlap_hits = self.max_overlap_hits.max(1);
        self.default_chaos = self.default_chaos.clamp(0.0, 1.0);
    }

    /// Parse from RON and clamp.
    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        let mut config: Self = ron::from_str(data)?;
        config.validate();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let mut config = FractureLinkConfig::default();
        let before = config.clone();
        config.validate();
        assert_eq!(config.max_overlap_hits, before.max_overlap_hits);
        assert_eq!(config.default_chaos, before.default_chaos);
    }

    #[test]
    fn test_from_ron_clamps() {
        let config = FractureLinkConfig::from_ron_str(
            "(max_overlap_hits: 0, default_chaos: 3.5, chaos_seed: 7)",
        )
        .unwrap();
        assert_eq!(config.max_overlap_hits, 1);
        assert_eq!(config.default_chaos, 1.0);
        assert_eq!(config.chaos_seed, 7);
    }

    #[test]
    fn test_malformed_ron_is_an_error() {
        assert!(FractureLinkConfig::from_ron_str("(max_overlap_hits:").is_err());
    }
}
