//! Detection sinks
use cascade_core::DetectionSink;
use tracing::info;

/// Keeps every reported pair.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Vec<(f32, f32)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[(f32, f32)] {
        &self.reports
    }

    pub fn last(&self) -> Option<(f32, f32)> {
        self.reports.last().copied()
    }
}

impl DetectionSink for RecordingSink {
    fn report(&mut self, person_score: f32, not_person_score: f32) {
        self.reports.push((person_score, not_person_score));
    }
}

/// Logs each detection, the way a device prints its result.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DetectionSink for TracingSink {
    fn report(&mut self, person_score: f32, not_person_score: f32) {
        info!(person_score, not_person_score, "detection");
    }
}
