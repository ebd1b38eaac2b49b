//! Tensor metadata and read-only views over arena bytes
use crate::error::CascadeError;
use serde::{Deserialize, Serialize};

/// Element type of a tensor as declared by a model or a stage port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Float32,
    Int8,
    UInt8,
}

impl ElementType {
    pub fn size_bytes(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Int8 | Self::UInt8 => 1,
        }
    }

    pub fn is_quantized(self) -> bool {
        matches!(self, Self::Int8 | Self::UInt8)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of a stage a tensor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorRole {
    Input,
    /// Float logits scored by the normalizer.
    Logits,
    /// Quantized features forwarded to the next stage.
    Handoff,
}

impl std::fmt::Display for TensorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Logits => "logits",
            Self::Handoff => "handoff",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub element_type: ElementType,
    pub element_count: usize,
}

impl TensorSpec {
    pub fn new(element_type: ElementType, element_count: usize) -> Self {
        Self {
            element_type,
            element_count,
        }
    }

    pub fn float32(element_count: usize) -> Self {
        Self::new(ElementType::Float32, element_count)
    }

    pub fn int8(element_count: usize) -> Self {
        Self::new(ElementType::Int8, element_count)
    }

    pub fn uint8(element_count: usize) -> Self {
        Self::new(ElementType::UInt8, element_count)
    }

    /// `None` when the size does not fit in `usize`.
    pub fn checked_byte_len(&self) -> Option<usize> {
        self.element_count.checked_mul(self.element_type.size_bytes())
    }

    /// Saturates at `usize::MAX`; validated specs never get there.
    pub fn byte_len(&self) -> usize {
        self.checked_byte_len().unwrap_or(usize::MAX)
    }
}

/// Placement of one tensor inside the arena, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSlot {
    pub offset: usize,
    pub spec: TensorSpec,
}

impl TensorSlot {
    pub fn new(offset: usize, spec: TensorSpec) -> Self {
        Self { offset, spec }
    }

    /// One past the last byte, or `None` if that overflows.
    pub fn checked_end(&self) -> Option<usize> {
        self.spec
            .checked_byte_len()
            .and_then(|len| self.offset.checked_add(len))
    }

    pub fn end(&self) -> usize {
        self.checked_end().unwrap_or(usize::MAX)
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.end()
    }
}

/// Borrowed view of one stage's tensor bytes.
///
/// Only obtainable through [`crate::TensorArena::tensor`], so holding one
/// keeps the arena from being rebound.
#[derive(Debug, Clone, Copy)]
pub struct RawTensor<'a> {
    stage: usize,
    role: TensorRole,
    spec: TensorSpec,
    bytes: &'a [u8],
}

impl<'a> RawTensor<'a> {
    /// Wraps bytes that already hold `spec.byte_len()` bytes of `spec.element_type`.
    pub fn from_bytes(
        stage: usize,
        role: TensorRole,
        spec: TensorSpec,
        bytes: &'a [u8],
    ) -> Result<Self, CascadeError> {
        if bytes.len() != spec.byte_len() {
            return Err(CascadeError::ShapeMismatch {
                stage,
                role,
                expected: spec.byte_len(),
                got: bytes.len(),
            });
        }
        Ok(Self {
            stage,
            role,
            spec,
            bytes,
        })
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn role(&self) -> TensorRole {
        self.role
    }

    pub fn spec(&self) -> TensorSpec {
        self.spec
    }

    pub fn element_type(&self) -> ElementType {
        self.spec.element_type
    }

    pub fn element_count(&self) -> usize {
        self.spec.element_count
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Fails unless this tensor has exactly the declared type and element count.
    pub fn check_spec(&self, declared: &TensorSpec) -> Result<(), CascadeError> {
        if self.spec.element_type != declared.element_type {
            return Err(CascadeError::TypeMismatch {
                stage: self.stage,
                role: self.role,
                expected: declared.element_type,
                got: self.spec.element_type,
            });
        }
        if self.spec.element_count != declared.element_count {
            return Err(CascadeError::ShapeMismatch {
                stage: self.stage,
                role: self.role,
                expected: declared.byte_len(),
                got: self.spec.byte_len(),
            });
        }
        Ok(())
    }

    /// Decodes a `Float32` tensor. Any other element type is a `TypeMismatch`.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, CascadeError> {
        if self.spec.element_type != ElementType::Float32 {
            return Err(CascadeError::TypeMismatch {
                stage: self.stage,
                role: self.role,
                expected: ElementType::Float32,
                got: self.spec.element_type,
            });
        }
        Ok(self
            .bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Reads one element widened to `f32`, regardless of element type.
    pub fn value_at(&self, index: usize) -> Option<f32> {
        if index >= self.spec.element_count {
            return None;
        }
        let value = match self.spec.element_type {
            ElementType::Float32 => {
                let c = &self.bytes[index * 4..index * 4 + 4];
                f32::from_ne_bytes([c[0], c[1], c[2], c[3]])
            }
            ElementType::Int8 => self.bytes[index] as i8 as f32,
            ElementType::UInt8 => self.bytes[index] as f32,
        };
        Some(value)
    }
}

/// Encodes `f32` values the way [`RawTensor::to_f32_vec`] decodes them.
pub fn encode_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Encodes `i8` values as raw bytes.
pub fn encode_i8(values: &[i8]) -> Vec<u8> {
    values.iter().map(|v| *v as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len() {
        assert_eq!(TensorSpec::float32(3).byte_len(), 12);
        assert_eq!(TensorSpec::int8(96 * 96).byte_len(), 9216);
    }

    #[test]
    fn test_oversized_spec_does_not_overflow() {
        let huge = TensorSpec::float32(usize::MAX / 2);
        assert_eq!(huge.checked_byte_len(), None);
        assert_eq!(huge.byte_len(), usize::MAX);

        let slot = TensorSlot::new(usize::MAX - 1, TensorSpec::int8(4));
        assert_eq!(slot.checked_end(), None);
        assert_eq!(slot.end(), usize::MAX);
        assert_eq!(TensorSlot::new(8, TensorSpec::int8(4)).checked_end(), Some(12));
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let bytes = [0u8; 7];
        let err = RawTensor::from_bytes(0, TensorRole::Logits, TensorSpec::float32(2), &bytes)
            .unwrap_err();
        assert!(matches!(
            err,
            CascadeError::ShapeMismatch { expected: 8, got: 7, .. }
        ));
    }

    #[test]
    fn test_f32_decode() {
        let bytes = encode_f32(&[1.5, -2.0]);
        let t = RawTensor::from_bytes(2, TensorRole::Logits, TensorSpec::float32(2), &bytes)
            .unwrap();
        assert_eq!(t.to_f32_vec().unwrap(), vec![1.5, -2.0]);
        assert_eq!(t.value_at(1), Some(-2.0));
        assert_eq!(t.value_at(2), None);
    }

    #[test]
    fn test_f32_decode_rejects_quantized() {
        let bytes = encode_i8(&[-3, 4]);
        let t = RawTensor::from_bytes(1, TensorRole::Handoff, TensorSpec::int8(2), &bytes)
            .unwrap();
        assert!(matches!(
            t.to_f32_vec(),
            Err(CascadeError::TypeMismatch { stage: 1, got: ElementType::Int8, .. })
        ));
        assert_eq!(t.value_at(0), Some(-3.0));
    }

    #[test]
    fn test_check_spec_type_before_count() {
        let bytes = encode_f32(&[0.0; 4]);
        let t = RawTensor::from_bytes(1, TensorRole::Handoff, TensorSpec::float32(4), &bytes)
            .unwrap();
        assert!(matches!(
            t.check_spec(&TensorSpec::int8(16)),
            Err(CascadeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            t.check_spec(&TensorSpec::float32(3)),
            Err(CascadeError::ShapeMismatch { expected: 12, got: 16, .. })
        ));
        assert!(t.check_spec(&TensorSpec::float32(4)).is_ok());
    }
}
