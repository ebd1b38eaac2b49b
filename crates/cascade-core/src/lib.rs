//! Cascade Core: tensor views, arena, engine seams and the unified error model
//!
//! Everything the cascade controller needs from its collaborators is
//! expressed here as types and traits. The inference engine, the capture
//! source and the reporting sink are external; this crate only fixes their
//! contracts.
//!
//! # Arena generations
//!
//! ```text
//! bind(stage 0) ─▶ gen 1 ─▶ views(gen 1) valid
//! bind(stage 1) ─▶ gen 2 ─▶ views(gen 1) rejected as stale
//! ```

pub mod arena;
pub mod config;
pub mod data_model;
pub mod engine;
pub mod error;
pub mod io;
pub mod tensor;

pub use arena::{TensorArena, TensorView};
pub use config::{CascadeConfig, ConfigError, HandoffMode};
pub use data_model::{
    CycleOutcome, CycleReport, Decision, DecisionScores, Phase, StageTrace, StopReason,
};
pub use engine::{EngineError, InferenceEngine, Interpreter};
pub use error::{CascadeError, ErrorKind};
pub use io::{CaptureError, CaptureSource, DetectionSink, FrameDims};
pub use tensor::{ElementType, RawTensor, TensorRole, TensorSlot, TensorSpec};

/// Version of the cascade core contracts
pub const CASCADE_VERSION: &str = "1.0.0";
