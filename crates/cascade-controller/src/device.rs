//! Device driver: `setup` once, then `loop_once` per captured frame
use crate::runner::CascadeController;
use crate::stats::ExitStats;
use cascade_core::{
    CascadeConfig, CascadeError, CaptureSource, CycleReport, DetectionSink, InferenceEngine,
};
use cascade_registry::StageRegistry;

pub struct CascadeDevice<E: InferenceEngine> {
    controller: CascadeController<E>,
    stats: ExitStats,
}

impl<E: InferenceEngine> CascadeDevice<E> {
    /// Load every stage. An error here is fatal for the process.
    pub fn setup(
        engine: E,
        registry: StageRegistry,
        config: CascadeConfig,
    ) -> Result<Self, CascadeError> {
        let stats = ExitStats::new(registry.len());
        let controller = CascadeController::new(engine, registry, config)?;
        Ok(Self { controller, stats })
    }

    pub fn loop_once<C, D>(&mut self, source: &mut C, sink: &mut D) -> CycleReport
    where
        C: CaptureSource + ?Sized,
        D: DetectionSink + ?Sized,
    {
        let report = self.controller.run_cycle(source, sink);
        self.stats.record(&report);
        report
    }

    /// Run `cycles` frames back to back.
    pub fn run<C, D>(&mut self, cycles: u64, source: &mut C, sink: &mut D) -> Vec<CycleReport>
    where
        C: CaptureSource + ?Sized,
        D: DetectionSink + ?Sized,
    {
        (0..cycles)
            .map(|_| self.loop_once(&mut *source, &mut *sink))
            .collect()
    }

    pub fn stats(&self) -> &ExitStats {
        &self.stats
    }

    pub fn controller(&self) -> &CascadeController<E> {
        &self.controller
    }
}
