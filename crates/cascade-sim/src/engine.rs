//! Scripted inference engine
use crate::model::{SimModel, SimOutput};
use cascade_core::{
    EngineError, InferenceEngine, Interpreter, TensorRole, TensorSlot,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Schema version the simulated engine accepts.
pub const SUPPORTED_SCHEMA_VERSION: u32 = 3;

const TENSOR_ALIGN: usize = 16;

/// One completed forward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub model: String,
    pub input: Vec<u8>,
}

/// Completed invocations, in order. Shared between an engine and its observers.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog(Rc<RefCell<Vec<Invocation>>>);

impl InvocationLog {
    fn push(&self, model: &str, input: Vec<u8>) {
        self.0.borrow_mut().push(Invocation {
            model: model.to_string(),
            input,
        });
    }

    /// Model names, in invocation order.
    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().iter().map(|i| i.model.clone()).collect()
    }

    pub fn count(&self, model: &str) -> usize {
        self.0.borrow().iter().filter(|i| i.model == model).count()
    }

    /// Inputs `model` was invoked with.
    pub fn inputs(&self, model: &str) -> Vec<Vec<u8>> {
        self.0
            .borrow()
            .iter()
            .filter(|i| i.model == model)
            .map(|i| i.input.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[derive(Debug, Default)]
pub struct SimEngine {
    log: InvocationLog,
    binds: usize,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that keeps observing invocations after the engine is moved.
    pub fn log(&self) -> InvocationLog {
        self.log.clone()
    }

    pub fn binds(&self) -> usize {
        self.binds
    }
}

impl InferenceEngine for SimEngine {
    type Model = Rc<SimModel>;
    type Interpreter = SimInterpreter;

    fn load_model(&self, blob: &[u8]) -> Result<Self::Model, EngineError> {
        let model: SimModel =
            serde_json::from_slice(blob).map_err(|e| EngineError::Malformed(e.to_string()))?;
        if model.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(EngineError::Schema {
                found: model.schema_version,
                supported: SUPPORTED_SCHEMA_VERSION,
            });
        }
        Ok(Rc::new(model))
    }

    fn bind(
        &mut self,
        model: &Self::Model,
        arena_capacity: usize,
    ) -> Result<Self::Interpreter, EngineError> {
        let too_large = EngineError::Allocation {
            required: usize::MAX,
            available: arena_capacity,
        };
        let mut offset = 0;
        let mut place = |spec| -> Option<TensorSlot> {
            let slot = TensorSlot::new(align_up(offset, TENSOR_ALIGN)?, spec);
            offset = slot.checked_end()?;
            Some(slot)
        };
        let input = place(model.input).ok_or_else(|| too_large.clone())?;
        let outputs = model
            .outputs
            .iter()
            .map(|o| place(o.spec()))
            .collect::<Option<Vec<TensorSlot>>>()
            .ok_or_else(|| too_large.clone())?;

        let required = offset.checked_add(model.scratch_bytes).ok_or(too_large)?;
        if required > arena_capacity {
            return Err(EngineError::Allocation {
                required,
                available: arena_capacity,
            });
        }

        self.binds += 1;
        trace!(model = %model.name, required, "bound simulated model");
        Ok(SimInterpreter {
            model: Rc::clone(model),
            input,
            outputs,
            log: self.log.clone(),
        })
    }
}

pub struct SimInterpreter {
    model: Rc<SimModel>,
    input: TensorSlot,
    outputs: Vec<TensorSlot>,
    log: InvocationLog,
}

impl Interpreter for SimInterpreter {
    fn invoke(&mut self, arena: &mut [u8]) -> Result<(), EngineError> {
        if let Some(message) = &self.model.fail_invoke {
            return Err(EngineError::Invoke(message.clone()));
        }
        let input = arena
            .get(self.input.range())
            .ok_or_else(|| EngineError::Invoke("input outside arena".into()))?
            .to_vec();

        for (output, slot) in self.model.outputs.iter().zip(&self.outputs) {
            let dest = arena
                .get_mut(slot.range())
                .ok_or_else(|| EngineError::Invoke("output outside arena".into()))?;
            match output {
                SimOutput::Logits {
                    values,
                    input_gain,
                    ..
                } => {
                    let shift = input_gain * signed_mean(&input) / 128.0;
                    for (i, chunk) in dest.chunks_exact_mut(4).enumerate() {
                        let mut v = values.get(i).copied().unwrap_or(0.0);
                        if i == 0 {
                            v += shift;
                        }
                        chunk.copy_from_slice(&v.to_ne_bytes());
                    }
                }
                SimOutput::Echo { .. } => {
                    if input.is_empty() {
                        dest.fill(0);
                    } else {
                        for (d, s) in dest.iter_mut().zip(input.iter().cycle()) {
                            *d = *s;
                        }
                    }
                }
            }
        }

        self.log.push(&self.model.name, input);
        Ok(())
    }

    fn input(&self, index: usize) -> Result<TensorSlot, EngineError> {
        match index {
            0 => Ok(self.input),
            _ => Err(EngineError::MissingTensor {
                role: TensorRole::Input,
                index,
            }),
        }
    }

    fn output(&self, index: usize) -> Result<TensorSlot, EngineError> {
        self.outputs
            .get(index)
            .copied()
            .ok_or(EngineError::MissingTensor {
                role: TensorRole::Logits,
                index,
            })
    }
}

fn signed_mean(bytes: &[u8]) -> f32 {
    if bytes.is_empty() {
        return 0.0;
    }
    let sum: i64 = bytes.iter().map(|b| *b as i8 as i64).sum();
    sum as f32 / bytes.len() as f32
}

fn align_up(n: usize, align: usize) -> Option<usize> {
    Some(n.checked_add(align - 1)? & !(align - 1))
}
