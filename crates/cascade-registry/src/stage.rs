//! Stage metadata
use cascade_core::{TensorRole, TensorSpec};
use serde::{Deserialize, Serialize};

/// One output tensor of a stage's model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPort {
    /// Engine output index
    pub tensor: usize,
    pub spec: TensorSpec,
}

impl OutputPort {
    pub fn new(tensor: usize, spec: TensorSpec) -> Self {
        Self { tensor, spec }
    }
}

/// Everything needed to register one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub name: String,
    /// Opaque model blob handed to the inference engine
    pub blob: Vec<u8>,
    pub input: TensorSpec,
    pub logits: OutputPort,
    /// Quantized features for the next stage; required on all but the last
    pub handoff: Option<OutputPort>,
}

impl StageSpec {
    pub fn new(
        name: impl Into<String>,
        blob: impl Into<Vec<u8>>,
        input: TensorSpec,
        logits: OutputPort,
    ) -> Self {
        Self {
            name: name.into(),
            blob: blob.into(),
            input,
            logits,
            handoff: None,
        }
    }

    pub fn with_handoff(mut self, handoff: OutputPort) -> Self {
        self.handoff = Some(handoff);
        self
    }
}

/// A registered stage. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    index: usize,
    spec: StageSpec,
    blob_hash: String,
}

impl Stage {
    pub(crate) fn new(index: usize, spec: StageSpec) -> Self {
        let blob_hash = format!("blake3:{}", blake3::hash(&spec.blob));
        Self {
            index,
            spec,
            blob_hash,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn blob(&self) -> &[u8] {
        &self.spec.blob
    }

    /// Digest of the model blob, for logs and reports.
    pub fn blob_hash(&self) -> &str {
        &self.blob_hash
    }

    pub fn input(&self) -> &TensorSpec {
        &self.spec.input
    }

    pub fn logits(&self) -> &OutputPort {
        &self.spec.logits
    }

    pub fn handoff(&self) -> Option<&OutputPort> {
        self.spec.handoff.as_ref()
    }

    pub fn port(&self, role: TensorRole) -> Option<TensorSpec> {
        match role {
            TensorRole::Input => Some(self.spec.input),
            TensorRole::Logits => Some(self.spec.logits.spec),
            TensorRole::Handoff => self.spec.handoff.map(|p| p.spec),
        }
    }
}
