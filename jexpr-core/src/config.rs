//! Evaluator configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! invocation_timeout_ms = 5000
//! max_depth = 256
//! allow_invocation = true
//! allow_assignment = true
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::expr::parser::DEFAULT_MAX_DEPTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// How long a method invoked in the debuggee may run
    pub invocation_timeout_ms: u64,
    /// Maximum expression nesting accepted by the parser
    pub max_depth: usize,
    /// Method calls are rejected when false
    pub allow_invocation: bool,
    /// Assignments are rejected when false
    pub allow_assignment: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            invocation_timeout_ms: 5000,
            max_depth: DEFAULT_MAX_DEPTH,
            allow_invocation: true,
            allow_assignment: true,
        }
    }
}

impl EvalConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        log::debug!("loaded evaluator config from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }
}
