//! Exit policy
use cascade_core::{Decision, StopReason};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitPolicy {
    threshold: f32,
}

impl ExitPolicy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `position` is the 1-based position of the stage just evaluated and
    /// `size` the number of stages. The last stage always stops.
    pub fn decide(&self, entropy: f32, position: usize, size: usize) -> Decision {
        if entropy < self.threshold {
            Decision::Stop(StopReason::Confident)
        } else if position >= size {
            Decision::Stop(StopReason::Exhausted)
        } else {
            Decision::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confident_stops_anywhere() {
        let policy = ExitPolicy::new(2.0);
        assert_eq!(policy.decide(0.5, 1, 3), Decision::Stop(StopReason::Confident));
        assert_eq!(policy.decide(1.999, 3, 3), Decision::Stop(StopReason::Confident));
    }

    #[test]
    fn test_uncertain_continues_until_last() {
        let policy = ExitPolicy::new(2.0);
        assert_eq!(policy.decide(3.0, 1, 3), Decision::Continue);
        assert_eq!(policy.decide(2.0, 2, 3), Decision::Continue);
        assert_eq!(policy.decide(5.0, 3, 3), Decision::Stop(StopReason::Exhausted));
    }

    #[test]
    fn test_single_stage_always_stops() {
        let policy = ExitPolicy::new(0.1);
        assert!(policy.decide(10.0, 1, 1).is_stop());
    }
}
