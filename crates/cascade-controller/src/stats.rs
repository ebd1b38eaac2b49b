//! Exit statistics across cycles
use cascade_core::{CycleOutcome, CycleReport, ErrorKind, StopReason};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running counters folded from cycle reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitStats {
    pub stage_count: usize,
    /// Reported cycles per exit stage
    pub exit_counts: Vec<u64>,
    pub confident_exits: u64,
    pub exhausted_exits: u64,
    /// Failed cycles per error kind
    pub failures: BTreeMap<ErrorKind, u64>,
    /// Forward passes completed, including those of failed cycles
    pub stages_evaluated: u64,
    exit_entropy_sum: f64,
}

/// Derived view of [`ExitStats`] for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub cycles: u64,
    pub reported: u64,
    pub failed: u64,
    pub exit_counts: Vec<u64>,
    pub confident_exits: u64,
    pub exhausted_exits: u64,
    pub failures: BTreeMap<ErrorKind, u64>,
    pub avg_depth: f64,
    pub compute_savings: f64,
    pub mean_exit_entropy: f64,
}

impl ExitStats {
    pub fn new(stage_count: usize) -> Self {
        Self {
            stage_count,
            exit_counts: vec![0; stage_count],
            ..Self::default()
        }
    }

    pub fn record(&mut self, report: &CycleReport) {
        self.stages_evaluated += report.stages.len() as u64;
        match &report.outcome {
            CycleOutcome::Reported { stage, reason, .. } => {
                if let Some(count) = self.exit_counts.get_mut(*stage) {
                    *count += 1;
                }
                match reason {
                    StopReason::Confident => self.confident_exits += 1,
                    StopReason::Exhausted => self.exhausted_exits += 1,
                }
                if let Some(last) = report.stages.last() {
                    self.exit_entropy_sum += last.entropy as f64;
                }
            }
            CycleOutcome::Failed { kind, .. } => {
                *self.failures.entry(*kind).or_insert(0) += 1;
            }
        }
    }

    pub fn reported(&self) -> u64 {
        self.exit_counts.iter().sum()
    }

    pub fn failed(&self) -> u64 {
        self.failures.values().sum()
    }

    pub fn cycles(&self) -> u64 {
        self.reported() + self.failed()
    }

    /// Mean 1-based exit position over reported cycles.
    pub fn avg_depth(&self) -> f64 {
        let reported = self.reported();
        if reported == 0 {
            return 0.0;
        }
        let weighted: u64 = self
            .exit_counts
            .iter()
            .enumerate()
            .map(|(stage, count)| (stage as u64 + 1) * count)
            .sum();
        weighted as f64 / reported as f64
    }

    /// Share of the full-depth cost avoided by exiting early.
    pub fn compute_savings(&self) -> f64 {
        if self.stage_count == 0 || self.reported() == 0 {
            return 0.0;
        }
        1.0 - self.avg_depth() / self.stage_count as f64
    }

    pub fn mean_exit_entropy(&self) -> f64 {
        let reported = self.reported();
        if reported == 0 {
            0.0
        } else {
            self.exit_entropy_sum / reported as f64
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            cycles: self.cycles(),
            reported: self.reported(),
            failed: self.failed(),
            exit_counts: self.exit_counts.clone(),
            confident_exits: self.confident_exits,
            exhausted_exits: self.exhausted_exits,
            failures: self.failures.clone(),
            avg_depth: self.avg_depth(),
            compute_savings: self.compute_savings(),
            mean_exit_entropy: self.mean_exit_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::{Decision, DecisionScores, Phase, StageTrace};
    use chrono::Utc;
    use uuid::Uuid;

    fn trace(stage: usize, entropy: f32) -> StageTrace {
        StageTrace {
            stage,
            name: format!("s{}", stage),
            entropy,
            decision: Decision::Continue,
            latency_us: 0,
            logits_hash: String::new(),
            handoff_hash: None,
        }
    }

    fn reported(stage: usize, reason: StopReason, entropy: f32) -> CycleReport {
        CycleReport {
            trace_id: Uuid::new_v4(),
            cycle: 1,
            ts: Utc::now(),
            stages: (0..=stage).map(|s| trace(s, if s == stage { entropy } else { 9.0 })).collect(),
            outcome: CycleOutcome::Reported {
                stage,
                reason,
                scores: DecisionScores { person: 0.0, not_person: 0.0 },
            },
            phase: Phase::Reported,
            history: vec![Phase::Uninitialized, Phase::Reported],
        }
    }

    fn failed(kind: ErrorKind) -> CycleReport {
        CycleReport {
            trace_id: Uuid::new_v4(),
            cycle: 1,
            ts: Utc::now(),
            stages: vec![trace(0, 3.0)],
            outcome: CycleOutcome::Failed { stage: Some(1), kind, message: String::new() },
            phase: Phase::Error,
            history: vec![Phase::Uninitialized, Phase::Error],
        }
    }

    #[test]
    fn test_depth_and_savings() {
        let mut stats = ExitStats::new(3);
        stats.record(&reported(0, StopReason::Confident, 0.5));
        stats.record(&reported(0, StopReason::Confident, 0.5));
        stats.record(&reported(2, StopReason::Exhausted, 4.0));
        stats.record(&reported(1, StopReason::Confident, 1.0));

        assert_eq!(stats.exit_counts, vec![2, 1, 1]);
        assert_eq!(stats.reported(), 4);
        assert!((stats.avg_depth() - 1.75).abs() < 1e-9);
        assert!((stats.compute_savings() - (1.0 - 1.75 / 3.0)).abs() < 1e-9);
        assert!((stats.mean_exit_entropy() - 1.5).abs() < 1e-9);
        assert_eq!(stats.confident_exits, 3);
        assert_eq!(stats.exhausted_exits, 1);
        assert_eq!(stats.stages_evaluated, 1 + 1 + 3 + 2);
    }

    #[test]
    fn test_failures_by_kind() {
        let mut stats = ExitStats::new(3);
        stats.record(&failed(ErrorKind::TypeMismatch));
        stats.record(&failed(ErrorKind::TypeMismatch));
        stats.record(&failed(ErrorKind::CaptureFailure));
        assert_eq!(stats.failed(), 3);
        assert_eq!(stats.reported(), 0);
        assert_eq!(stats.failures[&ErrorKind::TypeMismatch], 2);
        assert_eq!(stats.avg_depth(), 0.0);
        assert_eq!(stats.compute_savings(), 0.0);
    }

    #[test]
    fn test_summary_serializes() {
        let mut stats = ExitStats::new(2);
        stats.record(&reported(1, StopReason::Exhausted, 0.6));
        stats.record(&failed(ErrorKind::InvokeFailure));
        let json = serde_json::to_value(stats.summary()).unwrap();
        assert_eq!(json["cycles"], 2);
        assert_eq!(json["failures"]["invoke_failure"], 1);
    }
}
