// Copyright (c) 2024-2025 PrivacyPal Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Engine configuration

use crate::error::{PalError, PalResult};
use serde::{Deserialize, Serialize};

/// Default bound on traversal depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration shared by both request processors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest locator nesting a traversal may reach before it is aborted
    /// with [`PalError::DepthExceeded`]. `None` disables the guard, which
    /// lets a cyclic handler graph recurse forever.
    pub max_depth: Option<usize>,

    /// Check that no document is both deleted and updated before a plan is
    /// returned or committed
    pub verify_plan: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            verify_plan: true,
        }
    }
}

impl EngineConfig {
    /// Configuration without a depth guard
    pub fn unbounded() -> Self {
        Self {
            max_depth: None,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_verify_plan(mut self, verify_plan: bool) -> Self {
        self.verify_plan = verify_plan;
        self
    }

    /// Load from a JSON object; missing keys keep their defaults
    pub fn from_json(json: &str) -> PalResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PalError::Config(format!("invalid engine config: {}", e)))?;
        if config.max_depth == Some(0) {
            return Err(PalError::Config(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Fail once `depth` passes the configured bound
    pub(crate) fn check_depth(&self, depth: usize, locator: &crate::locator::Locator) -> PalResult<()> {
        match self.max_depth {
            Some(limit) if depth > limit => Err(PalError::DepthExceeded {
                limit,
                locator: locator.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
