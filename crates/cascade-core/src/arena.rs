//! Generation-tagged tensor arena.
//!
//! One fixed-size buffer is shared by every stage. Binding a stage bumps the
//! generation and clears the buffer; every [`TensorView`] remembers the
//! generation it was issued under and is rejected once that generation has
//! passed.

use crate::error::CascadeError;
use crate::tensor::{RawTensor, TensorRole, TensorSlot};

/// Fixed-size scratch memory handed to the inference engine.
pub struct TensorArena {
    buf: Vec<u8>,
    generation: u64,
    bound_stage: Option<usize>,
}

/// Handle to a tensor region, valid only for the generation it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorView {
    stage: usize,
    generation: u64,
    role: TensorRole,
    slot: TensorSlot,
}

impl TensorView {
    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn role(&self) -> TensorRole {
        self.role
    }

    pub fn slot(&self) -> TensorSlot {
        self.slot
    }
}

impl TensorArena {
    /// Create an arena with the given capacity in bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            generation: 0,
            bound_stage: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bound_stage(&self) -> Option<usize> {
        self.bound_stage
    }

    /// Make `stage` the active stage. Revokes every previously issued view.
    pub fn bind(&mut self, stage: usize) -> u64 {
        self.generation += 1;
        self.bound_stage = Some(stage);
        self.buf.fill(0);
        self.generation
    }

    /// Unbind at cycle end. Revokes every previously issued view.
    pub fn release(&mut self) {
        self.generation += 1;
        self.bound_stage = None;
    }

    /// Issue a view over `slot` for the currently bound stage.
    pub fn view(&self, role: TensorRole, slot: TensorSlot) -> Result<TensorView, CascadeError> {
        let stage = self.bound_stage.ok_or(CascadeError::Unbound)?;
        let required = slot.checked_end().unwrap_or(usize::MAX);
        if required > self.buf.len() {
            return Err(CascadeError::AllocationFailure {
                stage,
                required,
                available: self.buf.len(),
            });
        }
        Ok(TensorView {
            stage,
            generation: self.generation,
            role,
            slot,
        })
    }

    fn check(&self, view: &TensorView) -> Result<(), CascadeError> {
        if self.bound_stage.is_none() || view.generation != self.generation {
            return Err(CascadeError::StaleTensor {
                role: view.role,
                view_stage: view.stage,
                view_generation: view.generation,
                current_generation: self.generation,
            });
        }
        Ok(())
    }

    pub fn tensor(&self, view: &TensorView) -> Result<RawTensor<'_>, CascadeError> {
        self.check(view)?;
        RawTensor::from_bytes(
            view.stage,
            view.role,
            view.slot.spec,
            &self.buf[view.slot.range()],
        )
    }

    pub fn tensor_mut(&mut self, view: &TensorView) -> Result<&mut [u8], CascadeError> {
        self.check(view)?;
        Ok(&mut self.buf[view.slot.range()])
    }

    /// Copy `data` into the viewed region; lengths must match exactly.
    pub fn write(&mut self, view: &TensorView, data: &[u8]) -> Result<(), CascadeError> {
        let dest = self.tensor_mut(view)?;
        if dest.len() != data.len() {
            return Err(CascadeError::ShapeMismatch {
                stage: view.stage,
                role: view.role,
                expected: dest.len(),
                got: data.len(),
            });
        }
        dest.copy_from_slice(data);
        Ok(())
    }

    /// Whole buffer, for the engine's forward pass.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{encode_f32, TensorSpec};

    #[test]
    fn test_view_requires_binding() {
        let arena = TensorArena::new(64);
        let slot = TensorSlot::new(0, TensorSpec::float32(2));
        assert_eq!(arena.view(TensorRole::Logits, slot), Err(CascadeError::Unbound));
    }

    #[test]
    fn test_slot_past_capacity_is_allocation_failure() {
        let mut arena = TensorArena::new(16);
        arena.bind(0);
        let slot = TensorSlot::new(8, TensorSpec::float32(4));
        assert!(matches!(
            arena.view(TensorRole::Input, slot),
            Err(CascadeError::AllocationFailure { required: 24, available: 16, .. })
        ));
    }

    #[test]
    fn test_overflowing_slot_is_allocation_failure() {
        let mut arena = TensorArena::new(64);
        arena.bind(0);
        let slot = TensorSlot::new(usize::MAX - 1, TensorSpec::int8(4));
        assert!(matches!(
            arena.view(TensorRole::Logits, slot),
            Err(CascadeError::AllocationFailure { stage: 0, required: usize::MAX, available: 64 })
        ));
        let huge = TensorSlot::new(16, TensorSpec::float32(usize::MAX / 2));
        assert!(matches!(
            arena.view(TensorRole::Handoff, huge),
            Err(CascadeError::AllocationFailure { .. })
        ));
    }

    #[test]
    fn test_write_then_read() {
        let mut arena = TensorArena::new(64);
        arena.bind(0);
        let view = arena
            .view(TensorRole::Logits, TensorSlot::new(16, TensorSpec::float32(2)))
            .unwrap();
        arena.write(&view, &encode_f32(&[0.25, 4.0])).unwrap();
        let t = arena.tensor(&view).unwrap();
        assert_eq!(t.to_f32_vec().unwrap(), vec![0.25, 4.0]);
        assert_eq!(t.stage(), 0);
    }

    #[test]
    fn test_rebind_revokes_views() {
        let mut arena = TensorArena::new(64);
        arena.bind(0);
        let old = arena
            .view(TensorRole::Handoff, TensorSlot::new(0, TensorSpec::int8(8)))
            .unwrap();
        arena.bind(1);
        match arena.tensor(&old) {
            Err(CascadeError::StaleTensor {
                view_stage,
                view_generation,
                current_generation,
                ..
            }) => {
                assert_eq!(view_stage, 0);
                assert_eq!(view_generation, 1);
                assert_eq!(current_generation, 2);
            }
            other => panic!("expected stale view, got {:?}", other),
        }
        assert!(arena.write(&old, &[0u8; 8]).is_err());
    }

    #[test]
    fn test_release_revokes_views() {
        let mut arena = TensorArena::new(32);
        arena.bind(2);
        let view = arena
            .view(TensorRole::Logits, TensorSlot::new(0, TensorSpec::float32(1)))
            .unwrap();
        arena.release();
        assert_eq!(arena.bound_stage(), None);
        assert!(matches!(arena.tensor(&view), Err(CascadeError::StaleTensor { .. })));
    }

    #[test]
    fn test_bind_clears_previous_contents() {
        let mut arena = TensorArena::new(8);
        arena.bind(0);
        let view = arena
            .view(TensorRole::Input, TensorSlot::new(0, TensorSpec::uint8(8)))
            .unwrap();
        arena.write(&view, &[7u8; 8]).unwrap();
        arena.bind(1);
        let fresh = arena
            .view(TensorRole::Input, TensorSlot::new(0, TensorSpec::uint8(8)))
            .unwrap();
        assert!(arena.tensor(&fresh).unwrap().as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_write_length_mismatch() {
        let mut arena = TensorArena::new(8);
        arena.bind(3);
        let view = arena
            .view(TensorRole::Input, TensorSlot::new(0, TensorSpec::int8(4)))
            .unwrap();
        assert!(matches!(
            arena.write(&view, &[1, 2, 3]),
            Err(CascadeError::ShapeMismatch { stage: 3, expected: 4, got: 3, .. })
        ));
    }
}
