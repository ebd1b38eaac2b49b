//! Unified Error Model
use crate::tensor::{ElementType, TensorRole};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable classification of a [`CascadeError`], used for statistics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SchemaMismatch,
    AllocationFailure,
    InvokeFailure,
    TypeMismatch,
    ShapeMismatch,
    NumericDegenerate,
    CaptureFailure,
    StaleTensor,
    InvalidTransition,
    Registry,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaMismatch => "schema_mismatch",
            Self::AllocationFailure => "allocation_failure",
            Self::InvokeFailure => "invoke_failure",
            Self::TypeMismatch => "type_mismatch",
            Self::ShapeMismatch => "shape_mismatch",
            Self::NumericDegenerate => "numeric_degenerate",
            Self::CaptureFailure => "capture_failure",
            Self::StaleTensor => "stale_tensor",
            Self::InvalidTransition => "invalid_transition",
            Self::Registry => "registry",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    #[error("SCHEMA/MISMATCH: stage {stage}: {detail}")]
    SchemaMismatch { stage: usize, detail: String },

    #[error("ALLOC/ARENA: stage {stage}: {required} bytes required, arena holds {available}")]
    AllocationFailure {
        stage: usize,
        required: usize,
        available: usize,
    },

    #[error("INVOKE/FAILED: stage {stage}: {message}")]
    InvokeFailure { stage: usize, message: String },

    #[error("TYPE/MISMATCH: stage {stage}: {role} tensor expected {expected}, got {got}")]
    TypeMismatch {
        stage: usize,
        role: TensorRole,
        expected: ElementType,
        got: ElementType,
    },

    #[error("SHAPE/MISMATCH: stage {stage}: {role} tensor expected {expected} bytes, got {got}")]
    ShapeMismatch {
        stage: usize,
        role: TensorRole,
        expected: usize,
        got: usize,
    },

    #[error("NUMERIC/DEGENERATE: stage {stage}: {detail}")]
    NumericDegenerate { stage: usize, detail: String },

    #[error("CAPTURE/FAILED: stage {stage}: {message}")]
    CaptureFailure { stage: usize, message: String },

    #[error(
        "ARENA/STALE: {role} view of stage {view_stage} (generation {view_generation}) \
         used while generation {current_generation} is bound"
    )]
    StaleTensor {
        role: TensorRole,
        view_stage: usize,
        view_generation: u64,
        current_generation: u64,
    },

    #[error("ARENA/UNBOUND: no stage is bound to the arena")]
    Unbound,

    #[error("STATE/TRANSITION: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("REGISTRY/{0}")]
    Registry(String),
}

impl CascadeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            Self::InvokeFailure { .. } => ErrorKind::InvokeFailure,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::NumericDegenerate { .. } => ErrorKind::NumericDegenerate,
            Self::CaptureFailure { .. } => ErrorKind::CaptureFailure,
            Self::StaleTensor { .. } | Self::Unbound => ErrorKind::StaleTensor,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Registry(_) => ErrorKind::Registry,
        }
    }

    /// Stage ordinal the error is attributed to, when there is one.
    pub fn stage(&self) -> Option<usize> {
        match self {
            Self::SchemaMismatch { stage, .. }
            | Self::AllocationFailure { stage, .. }
            | Self::InvokeFailure { stage, .. }
            | Self::TypeMismatch { stage, .. }
            | Self::ShapeMismatch { stage, .. }
            | Self::NumericDegenerate { stage, .. }
            | Self::CaptureFailure { stage, .. } => Some(*stage),
            Self::StaleTensor { view_stage, .. } => Some(*view_stage),
            Self::Unbound | Self::InvalidTransition { .. } | Self::Registry(_) => None,
        }
    }
}
