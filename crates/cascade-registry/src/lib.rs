//! Cascade Registry: the fixed, ordered list of stages
//!
//! The registry answers "which model runs at position i and what do its
//! tensors look like". It is built once, validated once, and read-only
//! afterwards. Whether a stage is currently active is the controller's
//! business, not the registry's.

pub mod compat;
pub mod registry;
pub mod stage;

pub use compat::{chain_issues, ChainIssue};
pub use registry::{RegistryBuilder, StageRegistry};
pub use stage::{OutputPort, Stage, StageSpec};

use cascade_core::{CascadeError, ElementType, TensorRole};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("cascade has no stages")]
    Empty,

    #[error("stage {stage} ({name}): model blob is empty")]
    EmptyBlob { stage: usize, name: String },

    #[error("stage {stage}: {role} tensor declares zero elements")]
    ZeroElements { stage: usize, role: TensorRole },

    #[error("stage {stage}: {role} tensor of {count} elements does not fit in memory")]
    TooLarge {
        stage: usize,
        role: TensorRole,
        count: usize,
    },

    #[error("stage {stage}: logits must be float32, declared {got}")]
    LogitsNotFloat { stage: usize, got: ElementType },

    #[error("stage {stage}: handoff must be int8, declared {got}")]
    HandoffNotQuantized { stage: usize, got: ElementType },

    #[error("stage {stage}: logits and handoff share output tensor {tensor}")]
    SharedOutput { stage: usize, tensor: usize },

    #[error("stage {stage} is not the last stage but declares no handoff")]
    MissingHandoff { stage: usize },

    #[error("stage {stage}: decision index {index} outside {count} logits")]
    DecisionIndex {
        stage: usize,
        index: usize,
        count: usize,
    },

    #[error("registry holds {actual} stages, configuration expects {expected}")]
    StageCount { expected: usize, actual: usize },
}

impl From<RegistryError> for CascadeError {
    fn from(err: RegistryError) -> Self {
        CascadeError::Registry(err.to_string())
    }
}
