//! Cascade configuration
//!
//! Fixed at build or start-up time; the controller never reconfigures itself.

use crate::io::FrameDims;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG/IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("CONFIG/PARSE: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("CONFIG/INVALID: {0}")]
    Invalid(String),
}

/// What a later stage receives as its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandoffMode {
    /// The previous stage's handoff tensor, converted to the next input.
    #[default]
    Bridge,
    /// The captured frame, re-fed unchanged to every stage.
    Reframe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Size of the shared tensor arena in bytes
    pub arena_bytes: usize,

    /// Stop as soon as a stage's entropy falls below this (nats)
    pub entropy_threshold: f32,

    /// Expected number of stages; checked against the registry when set
    pub stage_count: Option<usize>,

    pub frame: FrameDims,

    /// Logits index read as the person score
    pub person_index: usize,

    /// Logits index read as the not-person score
    pub not_person_index: usize,

    pub handoff: HandoffMode,
}

impl CascadeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_bytes == 0 {
            return Err(ConfigError::Invalid("arena_bytes must be positive".into()));
        }
        if !self.entropy_threshold.is_finite() || self.entropy_threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "entropy_threshold must be a positive finite number, got {}",
                self.entropy_threshold
            )));
        }
        match self.frame.checked_byte_len() {
            Some(0) => {
                return Err(ConfigError::Invalid("frame dimensions must be non-zero".into()));
            }
            None => {
                return Err(ConfigError::Invalid(format!(
                    "{}x{}x{} frame does not fit in memory",
                    self.frame.cols, self.frame.rows, self.frame.channels
                )));
            }
            Some(_) => {}
        }
        if self.person_index == self.not_person_index {
            return Err(ConfigError::Invalid(format!(
                "person_index and not_person_index are both {}",
                self.person_index
            )));
        }
        if self.stage_count == Some(0) {
            return Err(ConfigError::Invalid("stage_count must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            arena_bytes: 136 * 1024,
            entropy_threshold: 2.0,
            stage_count: None,
            frame: FrameDims::default(),
            person_index: 1,
            not_person_index: 0,
            handoff: HandoffMode::Bridge,
        }
    }
}
