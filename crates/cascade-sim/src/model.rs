//! Simulated model description and stage declarations
use crate::engine::SUPPORTED_SCHEMA_VERSION;
use crate::SimError;
use cascade_core::TensorSpec;
use cascade_registry::{OutputPort, StageSpec};
use serde::{Deserialize, Serialize};

/// What a simulated output tensor is filled with on invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "fill")]
pub enum SimOutput {
    /// Fixed logits, shifted by `input_gain` times the mean signed input byte / 128.
    Logits {
        spec: TensorSpec,
        values: Vec<f32>,
        #[serde(default)]
        input_gain: f32,
    },
    /// Input bytes repeated to fill the tensor.
    Echo { spec: TensorSpec },
}

impl SimOutput {
    pub fn spec(&self) -> TensorSpec {
        match self {
            Self::Logits { spec, .. } | Self::Echo { spec } => *spec,
        }
    }
}

/// Contents of a simulated model blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimModel {
    pub schema_version: u32,
    pub name: String,
    pub input: TensorSpec,
    pub outputs: Vec<SimOutput>,
    /// Extra arena bytes the model needs beyond its tensors
    #[serde(default)]
    pub scratch_bytes: usize,
    #[serde(default)]
    pub fail_invoke: Option<String>,
}

impl SimModel {
    pub fn to_blob(&self) -> Result<Vec<u8>, SimError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// How a [`SimStage`]'s logits are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogitsSource {
    Values(Vec<f32>),
    Entropy { classes: usize, entropy: f32 },
}

impl LogitsSource {
    pub fn resolve(&self) -> Result<Vec<f32>, SimError> {
        match self {
            Self::Values(values) => Ok(values.clone()),
            Self::Entropy { classes, entropy } => logits_with_entropy(*classes, *entropy),
        }
    }
}

/// One simulated stage: the registry declaration and the model behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimStage {
    pub name: String,
    pub input: TensorSpec,
    pub logits: LogitsSource,
    #[serde(default)]
    pub input_gain: f32,
    /// Declared handoff; absent on the last stage
    #[serde(default)]
    pub handoff: Option<TensorSpec>,
    /// What the model really emits as handoff, when it differs from the declaration
    #[serde(default)]
    pub emitted_handoff: Option<TensorSpec>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub scratch_bytes: usize,
    #[serde(default)]
    pub fail_invoke: Option<String>,
}

fn default_schema_version() -> u32 {
    SUPPORTED_SCHEMA_VERSION
}

const LOGITS_TENSOR: usize = 0;
const HANDOFF_TENSOR: usize = 1;

impl SimStage {
    pub fn new(name: impl Into<String>, input: TensorSpec, logits: LogitsSource) -> Self {
        Self {
            name: name.into(),
            input,
            logits,
            input_gain: 0.0,
            handoff: None,
            emitted_handoff: None,
            schema_version: SUPPORTED_SCHEMA_VERSION,
            scratch_bytes: 0,
            fail_invoke: None,
        }
    }

    /// Stage whose logits have exactly `entropy` nats over `classes` classes.
    pub fn with_entropy(name: impl Into<String>, input: TensorSpec, classes: usize, entropy: f32) -> Self {
        Self::new(name, input, LogitsSource::Entropy { classes, entropy })
    }

    pub fn with_handoff(mut self, spec: TensorSpec) -> Self {
        self.handoff = Some(spec);
        self
    }

    pub fn emitting_handoff(mut self, spec: TensorSpec) -> Self {
        self.emitted_handoff = Some(spec);
        self
    }

    pub fn with_input_gain(mut self, gain: f32) -> Self {
        self.input_gain = gain;
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_scratch(mut self, bytes: usize) -> Self {
        self.scratch_bytes = bytes;
        self
    }

    pub fn failing_invoke(mut self, message: impl Into<String>) -> Self {
        self.fail_invoke = Some(message.into());
        self
    }

    pub fn model(&self) -> Result<SimModel, SimError> {
        let values = self.logits.resolve()?;
        let mut outputs = vec![SimOutput::Logits {
            spec: TensorSpec::float32(values.len()),
            values,
            input_gain: self.input_gain,
        }];
        if let Some(spec) = self.emitted_handoff.or(self.handoff) {
            outputs.push(SimOutput::Echo { spec });
        }
        Ok(SimModel {
            schema_version: self.schema_version,
            name: self.name.clone(),
            input: self.input,
            outputs,
            scratch_bytes: self.scratch_bytes,
            fail_invoke: self.fail_invoke.clone(),
        })
    }

    /// Registry declaration with the simulated model as its blob.
    pub fn spec(&self) -> Result<StageSpec, SimError> {
        let model = self.model()?;
        let logits = OutputPort::new(LOGITS_TENSOR, model.outputs[LOGITS_TENSOR].spec());
        let spec = StageSpec::new(self.name.clone(), model.to_blob()?, self.input, logits);
        Ok(match self.handoff {
            Some(handoff) => spec.with_handoff(OutputPort::new(HANDOFF_TENSOR, handoff)),
            None => spec,
        })
    }
}

/// Logits `[t, 0, 0, ...]` whose softmax has the requested entropy.
///
/// Entropy falls monotonically from `ln(classes)` at `t = 0` towards 0 as `t`
/// grows, so `t` is found by bisection.
pub fn logits_with_entropy(classes: usize, entropy: f32) -> Result<Vec<f32>, SimError> {
    if classes < 2 {
        return Err(SimError::Logits(format!("need at least 2 classes, got {}", classes)));
    }
    let max = (classes as f64).ln();
    let target = entropy as f64;
    if !(0.0..max).contains(&target) && target != max {
        return Err(SimError::Logits(format!(
            "entropy {} outside [0, ln {} = {:.4}]",
            entropy, classes, max
        )));
    }

    let entropy_at = |t: f64| {
        let rest = (classes - 1) as f64;
        let z = t.exp() + rest;
        let p_peak = t.exp() / z;
        let p_rest = 1.0 / z;
        -(p_peak * p_peak.ln()) - rest * p_rest * p_rest.ln()
    };

    let (mut lo, mut hi) = (0.0f64, 80.0f64);
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        if entropy_at(mid) > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let mut logits = vec![0.0f32; classes];
    logits[0] = ((lo + hi) / 2.0) as f32;
    Ok(logits)
}
