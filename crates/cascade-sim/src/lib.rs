//! Cascade Sim: reference collaborators for the cascade controller
//!
//! These stay small and deterministic. They let the controller run end to
//! end without a real inference engine or camera, and they record what
//! happened so tests can check which stages ran.
//!
//! A simulated model blob is a JSON [`SimModel`]. [`SimStage`] produces both
//! the blob and the matching registry declaration.

mod camera;
mod engine;
mod model;
mod sink;

pub use camera::SyntheticCamera;
pub use engine::{Invocation, InvocationLog, SimEngine, SimInterpreter, SUPPORTED_SCHEMA_VERSION};
pub use model::{logits_with_entropy, LogitsSource, SimModel, SimOutput, SimStage};
pub use sink::{RecordingSink, TracingSink};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("SIM/ENCODE: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("SIM/LOGITS: {0}")]
    Logits(String),
}
