//! Cascade Stages: numeric post-processing between forward passes
//!
//! # Per-stage flow
//!
//! ```text
//! logits ─▶ softmax ─▶ entropy ─▶ decision
//! handoff ─────────────▶ bridge ─▶ next stage input
//! ```

pub mod bridge;
pub mod normalizer;
pub mod scorer;

pub use bridge::{bridge, reframe, BridgedInput};
pub use normalizer::{softmax, softmax_slice, ProbabilityDistribution};
pub use scorer::{entropy, entropy_of};
