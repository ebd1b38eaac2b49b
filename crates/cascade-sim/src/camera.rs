//! Synthetic capture source
use cascade_core::{CaptureError, CaptureSource, FrameDims};

/// Produces a deterministic gradient frame per call; optionally fails on
/// chosen frame numbers.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    frames: u64,
    fail_on: Vec<u64>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the capture of these 0-based frame numbers.
    pub fn failing_on(mut self, frames: impl IntoIterator<Item = u64>) -> Self {
        self.fail_on = frames.into_iter().collect();
        self
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames
    }
}

impl CaptureSource for SyntheticCamera {
    fn capture_frame(&mut self, dims: FrameDims, dest: &mut [u8]) -> Result<(), CaptureError> {
        let frame = self.frames;
        self.frames += 1;

        if self.fail_on.contains(&frame) {
            return Err(CaptureError(format!("sensor read failed on frame {}", frame)));
        }
        if dest.len() != dims.byte_len() {
            return Err(CaptureError(format!(
                "{}x{}x{} frame needs {} bytes, destination holds {}",
                dims.cols,
                dims.rows,
                dims.channels,
                dims.byte_len(),
                dest.len()
            )));
        }

        let shift = (frame * 37) as usize;
        for (i, px) in dest.iter_mut().enumerate() {
            *px = ((i + shift) % 251) as u8;
        }
        Ok(())
    }
}
