//! Inference engine seam
//!
//! The engine loads model blobs, plans tensors into an arena of a given
//! capacity and runs forward passes. It never owns the arena: every call
//! that touches tensor memory borrows it from the controller.

use crate::error::CascadeError;
use crate::tensor::{TensorRole, TensorSlot};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("model provided is schema version {found} not equal to supported version {supported}")]
    Schema { found: u32, supported: u32 },

    #[error("malformed model blob: {0}")]
    Malformed(String),

    #[error("tensor allocation failed: {required} bytes required, {available} available")]
    Allocation { required: usize, available: usize },

    #[error("invoke failed: {0}")]
    Invoke(String),

    #[error("model has no {role} tensor at index {index}")]
    MissingTensor { role: TensorRole, index: usize },
}

impl EngineError {
    /// Attribute this failure to `stage`.
    pub fn at_stage(self, stage: usize) -> CascadeError {
        match self {
            Self::Schema { .. } | Self::Malformed(_) | Self::MissingTensor { .. } => {
                CascadeError::SchemaMismatch {
                    stage,
                    detail: self.to_string(),
                }
            }
            Self::Allocation {
                required,
                available,
            } => CascadeError::AllocationFailure {
                stage,
                required,
                available,
            },
            Self::Invoke(message) => CascadeError::InvokeFailure { stage, message },
        }
    }
}

/// An engine that can turn blobs into models and models into interpreters.
pub trait InferenceEngine {
    type Model;
    type Interpreter: Interpreter;

    /// Parse and version-check a model blob.
    fn load_model(&self, blob: &[u8]) -> Result<Self::Model, EngineError>;

    /// Plan `model`'s tensors into an arena of `arena_capacity` bytes.
    fn bind(
        &mut self,
        model: &Self::Model,
        arena_capacity: usize,
    ) -> Result<Self::Interpreter, EngineError>;
}

/// A model bound to the arena.
pub trait Interpreter {
    /// Run one forward pass over the arena bytes.
    fn invoke(&mut self, arena: &mut [u8]) -> Result<(), EngineError>;

    fn input(&self, index: usize) -> Result<TensorSlot, EngineError>;

    fn output(&self, index: usize) -> Result<TensorSlot, EngineError>;
}
