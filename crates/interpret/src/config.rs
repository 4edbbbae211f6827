//! Settings that choose how a revert is explained.
//!
//! There is no default policy: different consumers need a different REVERT or
//! window, so callers always say which one they want.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{locate::RevertPolicy, source::DEFAULT_SOURCE_CACHE_CAPACITY, window::WindowPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Source map cache capacity must be at least 1")]
    ZeroCacheCapacity,
    #[error("serde_json error {0}")]
    SerdeJson(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub revert_policy: RevertPolicy,
    pub window_policy: WindowPolicy,
    /// Contracts whose source maps are kept between traces.
    #[serde(default = "default_capacity")]
    pub source_cache_capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_SOURCE_CACHE_CAPACITY
}

impl AnalysisConfig {
    pub fn new(revert_policy: RevertPolicy, window_policy: WindowPolicy) -> Self {
        Self {
            revert_policy,
            window_policy,
            source_cache_capacity: DEFAULT_SOURCE_CACHE_CAPACITY,
        }
    }

    /// Reads a config such as
    /// `{"revertPolicy": "lastMatch", "windowPolicy": {"fixedRadius": {"radius": 10}}}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_cache_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        Ok(())
    }
}
