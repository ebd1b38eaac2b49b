//! Data Model: decisions, stage traces and cycle reports
use crate::error::{CascadeError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a cycle is in the cascade state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    StageBound,
    Inferred,
    Evaluated,
    Reported,
    Error,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reported | Self::Error)
    }

    /// Legal edges. `Error` is reachable from every non-terminal phase.
    pub fn can_enter(&self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (*self, next),
            (Uninitialized, StageBound)
                | (StageBound, Inferred)
                | (Inferred, Evaluated)
                | (Evaluated, StageBound)
                | (Evaluated, Reported)
        ) || (!self.is_terminal() && next == Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Entropy fell below the threshold.
    Confident,
    /// No further stage exists.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "reason")]
pub enum Decision {
    Stop(StopReason),
    Continue,
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop(_))
    }
}

/// Final pair handed to the reporting sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionScores {
    pub person: f32,
    pub not_person: f32,
}

/// What happened at one stage of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    pub stage: usize,
    pub name: String,
    pub entropy: f32,
    pub decision: Decision,
    pub latency_us: u64,
    /// blake3 digest of the logits bytes
    pub logits_hash: String,
    /// blake3 digest of the handoff bytes, for stages that bridged onward
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CycleOutcome {
    Reported {
        stage: usize,
        reason: StopReason,
        scores: DecisionScores,
    },
    Failed {
        stage: Option<usize>,
        kind: ErrorKind,
        message: String,
    },
}

impl CycleOutcome {
    pub fn failed(err: &CascadeError) -> Self {
        Self::Failed {
            stage: err.stage(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub trace_id: Uuid,
    pub cycle: u64,
    pub ts: DateTime<Utc>,
    pub stages: Vec<StageTrace>,
    pub outcome: CycleOutcome,
    /// Phase the cycle ended in: `Reported` or `Error`
    pub phase: Phase,
    /// Every phase entered, starting with `Uninitialized`
    pub history: Vec<Phase>,
}

impl CycleReport {
    /// Stages whose forward pass completed, in order.
    pub fn stages_evaluated(&self) -> Vec<usize> {
        self.stages.iter().map(|s| s.stage).collect()
    }

    pub fn exit_stage(&self) -> Option<usize> {
        match self.outcome {
            CycleOutcome::Reported { stage, .. } => Some(stage),
            CycleOutcome::Failed { .. } => None,
        }
    }
}
