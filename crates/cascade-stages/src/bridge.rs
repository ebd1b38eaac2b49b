//! Stage Bridge
//!
//! Copies a stage's handoff tensor out of the arena and converts it into the
//! next stage's input representation. The result owns its bytes, so it
//! survives the rebinding that revokes the source view.

use cascade_core::{CascadeError, ElementType, RawTensor, TensorRole, TensorSpec};

/// Element type stages exchange across a bridge.
pub const HANDOFF_TYPE: ElementType = ElementType::Int8;

/// Input bytes prepared for one stage, detached from the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgedInput {
    target_stage: usize,
    spec: TensorSpec,
    bytes: Vec<u8>,
}

impl BridgedInput {
    pub fn target_stage(&self) -> usize {
        self.target_stage
    }

    pub fn spec(&self) -> TensorSpec {
        self.spec
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Convert `handoff` (declared as `declared`) into input for `next_stage`.
pub fn bridge(
    handoff: &RawTensor<'_>,
    declared: &TensorSpec,
    next_stage: usize,
    next_input: &TensorSpec,
) -> Result<BridgedInput, CascadeError> {
    if declared.element_type != HANDOFF_TYPE || handoff.element_type() != declared.element_type {
        return Err(CascadeError::TypeMismatch {
            stage: handoff.stage(),
            role: TensorRole::Handoff,
            expected: HANDOFF_TYPE,
            got: handoff.element_type(),
        });
    }

    let bytes = convert(handoff.as_bytes(), HANDOFF_TYPE, next_stage, next_input)?;
    finish(bytes, next_stage, next_input)
}

/// Re-feed the captured frame, stored as `frame_type`, to `next_stage`.
///
/// The frame goes through the same 8-bit conversion as a bridged handoff.
pub fn reframe(
    frame: &[u8],
    frame_type: ElementType,
    next_stage: usize,
    next_input: &TensorSpec,
) -> Result<BridgedInput, CascadeError> {
    let bytes = convert(frame, frame_type, next_stage, next_input)?;
    finish(bytes, next_stage, next_input)
}

fn convert(
    src: &[u8],
    from: ElementType,
    next_stage: usize,
    next_input: &TensorSpec,
) -> Result<Vec<u8>, CascadeError> {
    match (from, next_input.element_type) {
        (ElementType::Int8, ElementType::Int8) | (ElementType::UInt8, ElementType::UInt8) => {
            Ok(src.to_vec())
        }
        // int8 <-> uint8 is a 128 offset, i.e. a sign-bit flip
        (ElementType::Int8, ElementType::UInt8) | (ElementType::UInt8, ElementType::Int8) => {
            Ok(src.iter().map(|b| b ^ 0x80).collect())
        }
        (from, got) => Err(CascadeError::TypeMismatch {
            stage: next_stage,
            role: TensorRole::Input,
            expected: if from.is_quantized() { from } else { HANDOFF_TYPE },
            got,
        }),
    }
}

fn finish(
    bytes: Vec<u8>,
    next_stage: usize,
    next_input: &TensorSpec,
) -> Result<BridgedInput, CascadeError> {
    if bytes.len() != next_input.byte_len() {
        return Err(CascadeError::ShapeMismatch {
            stage: next_stage,
            role: TensorRole::Input,
            expected: next_input.byte_len(),
            got: bytes.len(),
        });
    }
    Ok(BridgedInput {
        target_stage: next_stage,
        spec: *next_input,
        bytes,
    })
}
