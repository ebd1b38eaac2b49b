//! Cascade Controller: binds, invokes, scores and decides, one stage at a time
use crate::context::CascadeState;
use crate::policy::ExitPolicy;
use cascade_core::{
    CascadeConfig, CascadeError, CaptureSource, CycleOutcome, CycleReport, Decision,
    DecisionScores, DetectionSink, HandoffMode, InferenceEngine, Interpreter, Phase, RawTensor,
    StageTrace, TensorArena, TensorRole, TensorView,
};
use cascade_registry::{OutputPort, StageRegistry};
use cascade_stages::{bridge, entropy, reframe, softmax, BridgedInput};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

pub struct CascadeController<E: InferenceEngine> {
    engine: E,
    registry: StageRegistry,
    models: Vec<E::Model>,
    arena: TensorArena,
    config: CascadeConfig,
    policy: ExitPolicy,
    cycles: u64,
}

impl<E: InferenceEngine> CascadeController<E> {
    /// Validate the configuration against the registry and load every
    /// stage's model. Any failure here means no valid cascade exists.
    pub fn new(
        engine: E,
        registry: StageRegistry,
        config: CascadeConfig,
    ) -> Result<Self, CascadeError> {
        config
            .validate()
            .map_err(|e| CascadeError::Registry(e.to_string()))?;
        registry.check_stage_count(config.stage_count)?;
        registry.check_decision_indices(config.person_index, config.not_person_index)?;

        let mut models = Vec::with_capacity(registry.len());
        for stage in registry.iter() {
            let model = engine.load_model(stage.blob()).map_err(|e| {
                let err = e.at_stage(stage.index());
                error!(stage = stage.index(), name = stage.name(), error = %err, "model load failed");
                err
            })?;
            debug!(stage = stage.index(), name = stage.name(), blob = stage.blob_hash(), "model loaded");
            models.push(model);
        }

        info!(
            stages = registry.len(),
            arena_bytes = config.arena_bytes,
            threshold = config.entropy_threshold,
            "cascade ready"
        );

        Ok(Self {
            engine,
            policy: ExitPolicy::new(config.entropy_threshold),
            arena: TensorArena::new(config.arena_bytes),
            registry,
            models,
            config,
            cycles: 0,
        })
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn policy(&self) -> ExitPolicy {
        self.policy
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one input frame to a decision or a failure.
    ///
    /// Failures are cycle-scoped: they end up in the report and the next
    /// call starts again from stage 0.
    pub fn run_cycle<C, D>(&mut self, source: &mut C, sink: &mut D) -> CycleReport
    where
        C: CaptureSource + ?Sized,
        D: DetectionSink + ?Sized,
    {
        self.cycles += 1;
        let mut state = CascadeState::new(self.cycles);
        let span = info_span!("cycle", trace_id = %state.trace_id(), cycle = self.cycles);
        let _enter = span.enter();

        let mut traces = Vec::new();
        let outcome = match self.drive(&mut state, &mut traces, source, sink) {
            Ok(outcome) => outcome,
            Err(err) => {
                state.fail();
                warn!(
                    stage = ?err.stage(),
                    reached = state.stage(),
                    kind = %err.kind(),
                    error = %err,
                    "cycle aborted"
                );
                CycleOutcome::failed(&err)
            }
        };
        self.arena.release();

        CycleReport {
            trace_id: state.trace_id(),
            cycle: state.cycle(),
            ts: Utc::now(),
            stages: traces,
            outcome,
            phase: state.phase(),
            history: state.into_history(),
        }
    }

    fn drive<C, D>(
        &mut self,
        state: &mut CascadeState,
        traces: &mut Vec<StageTrace>,
        source: &mut C,
        sink: &mut D,
    ) -> Result<CycleOutcome, CascadeError>
    where
        C: CaptureSource + ?Sized,
        D: DetectionSink + ?Sized,
    {
        let size = self.registry.len();
        let mut index = 0;
        let mut interpreter = self.bind_stage(state, index)?;
        self.capture(state, &interpreter, source)?;

        loop {
            let started = Instant::now();
            interpreter
                .invoke(self.arena.bytes_mut())
                .map_err(|e| e.at_stage(index))?;
            state.transition(Phase::Inferred)?;

            let stage = self
                .registry
                .get(index)
                .ok_or_else(|| CascadeError::Registry(format!("no stage {}", index)))?;
            let logits_view = self.output_view(&interpreter, index, TensorRole::Logits, stage.logits())?;
            let logits = self.arena.tensor(&logits_view)?;
            let h = entropy(&softmax(&logits)?);
            let decision = self.policy.decide(h, index + 1, size);
            state.transition(Phase::Evaluated)?;

            debug!(
                stage = index,
                name = stage.name(),
                entropy = h,
                threshold = self.policy.threshold(),
                ?decision,
                "stage evaluated"
            );
            traces.push(StageTrace {
                stage: index,
                name: stage.name().to_string(),
                entropy: h,
                decision,
                latency_us: started.elapsed().as_micros() as u64,
                logits_hash: digest(logits.as_bytes()),
                handoff_hash: None,
            });

            match decision {
                Decision::Stop(reason) => {
                    let scores = self.read_scores(&logits)?;
                    state.transition(Phase::Reported)?;
                    sink.report(scores.person, scores.not_person);
                    info!(
                        stage = index,
                        ?reason,
                        person = scores.person,
                        not_person = scores.not_person,
                        "detection reported"
                    );
                    return Ok(CycleOutcome::Reported {
                        stage: index,
                        reason,
                        scores,
                    });
                }
                Decision::Continue => {
                    let next = index + 1;
                    // Copy out before rebinding revokes this stage's views.
                    let (input, handoff_hash) = self.next_input(state, &interpreter, index, next)?;
                    if let Some(trace) = traces.last_mut() {
                        trace.handoff_hash = handoff_hash;
                    }
                    interpreter = self.bind_stage(state, next)?;
                    let view = self.input_view(&interpreter, next)?;
                    self.arena.write(&view, input.as_bytes())?;
                    debug!(stage = next, bytes = input.byte_len(), "stage input written");
                    index = next;
                }
            }
        }
    }

    fn bind_stage(
        &mut self,
        state: &mut CascadeState,
        index: usize,
    ) -> Result<E::Interpreter, CascadeError> {
        let model = self
            .models
            .get(index)
            .ok_or_else(|| CascadeError::Registry(format!("no model for stage {}", index)))?;
        let generation = self.arena.bind(index);
        let interpreter = self
            .engine
            .bind(model, self.arena.capacity())
            .map_err(|e| e.at_stage(index))?;
        state.bind(index)?;
        debug!(stage = index, generation, "stage bound");
        Ok(interpreter)
    }

    fn capture<C>(
        &mut self,
        state: &mut CascadeState,
        interpreter: &E::Interpreter,
        source: &mut C,
    ) -> Result<(), CascadeError>
    where
        C: CaptureSource + ?Sized,
    {
        let view = self.input_view(interpreter, 0)?;
        let frame_bytes = self.config.frame.byte_len();
        if view.slot().spec.byte_len() != frame_bytes {
            return Err(CascadeError::ShapeMismatch {
                stage: 0,
                role: TensorRole::Input,
                expected: view.slot().spec.byte_len(),
                got: frame_bytes,
            });
        }

        let dest = self.arena.tensor_mut(&view)?;
        source
            .capture_frame(self.config.frame, dest)
            .map_err(|e| CascadeError::CaptureFailure {
                stage: 0,
                message: e.to_string(),
            })?;

        if self.config.handoff == HandoffMode::Reframe {
            let frame = self.arena.tensor(&view)?.as_bytes().to_vec();
            state.keep_frame(frame);
        }
        Ok(())
    }

    fn next_input(
        &self,
        state: &CascadeState,
        interpreter: &E::Interpreter,
        index: usize,
        next: usize,
    ) -> Result<(BridgedInput, Option<String>), CascadeError> {
        let (stage, next_stage) = match (self.registry.get(index), self.registry.get(next)) {
            (Some(stage), Some(next_stage)) => (stage, next_stage),
            _ => return Err(CascadeError::Registry(format!("no stage {}", next))),
        };

        match self.config.handoff {
            HandoffMode::Bridge => {
                let port = stage.handoff().ok_or_else(|| {
                    CascadeError::Registry(format!("stage {} declares no handoff", index))
                })?;
                let view = self.output_view(interpreter, index, TensorRole::Handoff, port)?;
                let handoff = self.arena.tensor(&view)?;
                let input = bridge(&handoff, &port.spec, next, next_stage.input())?;
                Ok((input, Some(digest(handoff.as_bytes()))))
            }
            HandoffMode::Reframe => {
                let frame = state.frame().ok_or_else(|| CascadeError::InvalidTransition {
                    from: "no captured frame".to_string(),
                    to: format!("stage {}", next),
                })?;
                let frame_type = self
                    .registry
                    .get(0)
                    .map(|s| s.input().element_type)
                    .ok_or_else(|| CascadeError::Registry("no stage 0".to_string()))?;
                Ok((reframe(frame, frame_type, next, next_stage.input())?, None))
            }
        }
    }

    /// View of the stage's input tensor, checked against its declaration.
    fn input_view(
        &self,
        interpreter: &E::Interpreter,
        index: usize,
    ) -> Result<TensorView, CascadeError> {
        let declared = self
            .registry
            .get(index)
            .map(|s| *s.input())
            .ok_or_else(|| CascadeError::Registry(format!("no stage {}", index)))?;
        let slot = interpreter.input(0).map_err(|e| e.at_stage(index))?;
        let view = self.arena.view(TensorRole::Input, slot)?;
        self.arena.tensor(&view)?.check_spec(&declared)?;
        Ok(view)
    }

    /// View of one declared output port, checked against its declaration.
    fn output_view(
        &self,
        interpreter: &E::Interpreter,
        index: usize,
        role: TensorRole,
        port: &OutputPort,
    ) -> Result<TensorView, CascadeError> {
        let slot = interpreter.output(port.tensor).map_err(|e| e.at_stage(index))?;
        let view = self.arena.view(role, slot)?;
        self.arena.tensor(&view)?.check_spec(&port.spec)?;
        Ok(view)
    }

    fn read_scores(&self, logits: &RawTensor<'_>) -> Result<DecisionScores, CascadeError> {
        let read = |index: usize| {
            logits.value_at(index).ok_or(CascadeError::ShapeMismatch {
                stage: logits.stage(),
                role: TensorRole::Logits,
                expected: (index + 1) * logits.element_type().size_bytes(),
                got: logits.spec().byte_len(),
            })
        };
        Ok(DecisionScores {
            person: read(self.config.person_index)?,
            not_person: read(self.config.not_person_index)?,
        })
    }
}

fn digest(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes))
}
