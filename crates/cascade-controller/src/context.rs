//! Per-cycle cascade state
use cascade_core::{CascadeError, Phase};
use uuid::Uuid;

/// Everything one cycle knows. Created per input frame, dropped at cycle end.
#[derive(Debug)]
pub struct CascadeState {
    trace_id: Uuid,
    cycle: u64,
    phase: Phase,
    history: Vec<Phase>,
    stage: usize,
    frame: Option<Vec<u8>>,
}

impl CascadeState {
    pub fn new(cycle: u64) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            cycle,
            phase: Phase::Uninitialized,
            history: vec![Phase::Uninitialized],
            stage: 0,
            frame: None,
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn frame(&self) -> Option<&[u8]> {
        self.frame.as_deref()
    }

    pub fn transition(&mut self, next: Phase) -> Result<(), CascadeError> {
        if !self.phase.can_enter(next) {
            return Err(CascadeError::InvalidTransition {
                from: format!("{:?}", self.phase),
                to: format!("{:?}", next),
            });
        }
        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    /// Bind `stage`. Stages only ever move forward.
    pub fn bind(&mut self, stage: usize) -> Result<(), CascadeError> {
        let first = self.phase == Phase::Uninitialized;
        if (first && stage != 0) || (!first && stage != self.stage + 1) {
            return Err(CascadeError::InvalidTransition {
                from: format!("stage {}", self.stage),
                to: format!("stage {}", stage),
            });
        }
        self.transition(Phase::StageBound)?;
        self.stage = stage;
        Ok(())
    }

    /// Phase history, consumed at cycle end.
    pub fn into_history(self) -> Vec<Phase> {
        self.history
    }

    /// Enter `Error` unless the cycle already ended.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Error;
            self.history.push(Phase::Error);
        }
    }

    pub fn keep_frame(&mut self, frame: Vec<u8>) {
        self.frame = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = CascadeState::new(1);
        state.bind(0).unwrap();
        state.transition(Phase::Inferred).unwrap();
        state.transition(Phase::Evaluated).unwrap();
        state.bind(1).unwrap();
        state.transition(Phase::Inferred).unwrap();
        state.transition(Phase::Evaluated).unwrap();
        state.transition(Phase::Reported).unwrap();

        assert!(state.phase().is_terminal());
        assert_eq!(state.stage(), 1);
        assert_eq!(
            state.into_history(),
            &[
                Phase::Uninitialized,
                Phase::StageBound,
                Phase::Inferred,
                Phase::Evaluated,
                Phase::StageBound,
                Phase::Inferred,
                Phase::Evaluated,
                Phase::Reported,
            ]
        );
    }

    #[test]
    fn test_cannot_skip_evaluation() {
        let mut state = CascadeState::new(1);
        state.bind(0).unwrap();
        assert!(matches!(
            state.transition(Phase::Reported),
            Err(CascadeError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_no_backtracking_or_skipping() {
        let mut state = CascadeState::new(1);
        assert!(state.bind(1).is_err());
        state.bind(0).unwrap();
        state.transition(Phase::Inferred).unwrap();
        state.transition(Phase::Evaluated).unwrap();
        assert!(state.bind(2).is_err());
        assert!(state.bind(0).is_err());
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut state = CascadeState::new(1);
        state.bind(0).unwrap();
        state.fail();
        assert_eq!(state.phase(), Phase::Error);
        assert!(state.transition(Phase::Inferred).is_err());
        state.fail();
        let history = state.into_history();
        assert_eq!(history.iter().filter(|p| **p == Phase::Error).count(), 1);
        assert_eq!(history.last(), Some(&Phase::Error));
    }
}
