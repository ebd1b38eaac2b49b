//! Capture source and reporting sink seams
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame geometry requested from the capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDims {
    pub cols: usize,
    pub rows: usize,
    pub channels: usize,
}

impl FrameDims {
    pub fn new(cols: usize, rows: usize, channels: usize) -> Self {
        Self {
            cols,
            rows,
            channels,
        }
    }

    /// Bytes of one 8-bit frame, or `None` if that overflows.
    pub fn checked_byte_len(&self) -> Option<usize> {
        self.cols
            .checked_mul(self.rows)
            .and_then(|n| n.checked_mul(self.channels))
    }

    /// Bytes of one 8-bit frame. Saturates like [`crate::TensorSpec::byte_len`].
    pub fn byte_len(&self) -> usize {
        self.checked_byte_len().unwrap_or(usize::MAX)
    }
}

impl Default for FrameDims {
    fn default() -> Self {
        Self::new(96, 96, 1)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct CaptureError(pub String);

/// Source of raw frames. Writes straight into stage 0's input region.
pub trait CaptureSource {
    fn capture_frame(&mut self, dims: FrameDims, dest: &mut [u8]) -> Result<(), CaptureError>;
}

/// Receiver of the final decision pair. Fire-and-forget.
pub trait DetectionSink {
    fn report(&mut self, person_score: f32, not_person_score: f32);
}
