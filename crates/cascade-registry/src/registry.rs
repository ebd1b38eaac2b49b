//! Stage Registry
use crate::stage::{Stage, StageSpec};
use crate::RegistryError;
use cascade_core::{ElementType, TensorRole};

/// Ordered, read-only list of cascade stages.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRegistry {
    stages: Vec<Stage>,
}

impl StageRegistry {
    pub fn new(specs: Vec<StageSpec>) -> Result<Self, RegistryError> {
        if specs.is_empty() {
            return Err(RegistryError::Empty);
        }
        let last = specs.len() - 1;
        for (index, spec) in specs.iter().enumerate() {
            validate_stage(index, spec, index == last)?;
        }
        Ok(Self {
            stages: specs
                .into_iter()
                .enumerate()
                .map(|(i, spec)| Stage::new(i, spec))
                .collect(),
        })
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.stages.len()
    }

    /// Every stage may end the cascade, so both decision indices must fall
    /// inside every stage's logits.
    pub fn check_decision_indices(
        &self,
        person_index: usize,
        not_person_index: usize,
    ) -> Result<(), RegistryError> {
        for stage in &self.stages {
            let count = stage.logits().spec.element_count;
            for index in [person_index, not_person_index] {
                if index >= count {
                    return Err(RegistryError::DecisionIndex {
                        stage: stage.index(),
                        index,
                        count,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn check_stage_count(&self, expected: Option<usize>) -> Result<(), RegistryError> {
        match expected {
            Some(expected) if expected != self.len() => Err(RegistryError::StageCount {
                expected,
                actual: self.len(),
            }),
            _ => Ok(()),
        }
    }
}

fn validate_stage(index: usize, spec: &StageSpec, is_last: bool) -> Result<(), RegistryError> {
    if spec.blob.is_empty() {
        return Err(RegistryError::EmptyBlob {
            stage: index,
            name: spec.name.clone(),
        });
    }
    if spec.input.element_count == 0 {
        return Err(RegistryError::ZeroElements {
            stage: index,
            role: TensorRole::Input,
        });
    }
    if spec.logits.spec.element_count == 0 {
        return Err(RegistryError::ZeroElements {
            stage: index,
            role: TensorRole::Logits,
        });
    }
    let ports = [
        (TensorRole::Input, Some(spec.input)),
        (TensorRole::Logits, Some(spec.logits.spec)),
        (TensorRole::Handoff, spec.handoff.map(|p| p.spec)),
    ];
    for (role, declared) in ports {
        if let Some(declared) = declared {
            if declared.checked_byte_len().is_none() {
                return Err(RegistryError::TooLarge {
                    stage: index,
                    role,
                    count: declared.element_count,
                });
            }
        }
    }
    if spec.logits.spec.element_type != ElementType::Float32 {
        return Err(RegistryError::LogitsNotFloat {
            stage: index,
            got: spec.logits.spec.element_type,
        });
    }
    match &spec.handoff {
        Some(handoff) => {
            if handoff.spec.element_type != ElementType::Int8 {
                return Err(RegistryError::HandoffNotQuantized {
                    stage: index,
                    got: handoff.spec.element_type,
                });
            }
            if handoff.spec.element_count == 0 {
                return Err(RegistryError::ZeroElements {
                    stage: index,
                    role: TensorRole::Handoff,
                });
            }
            if handoff.tensor == spec.logits.tensor {
                return Err(RegistryError::SharedOutput {
                    stage: index,
                    tensor: handoff.tensor,
                });
            }
        }
        None if !is_last => return Err(RegistryError::MissingHandoff { stage: index }),
        None => {}
    }
    Ok(())
}

/// Collects stages in order, then validates them all at once.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    specs: Vec<StageSpec>,
}

impl RegistryBuilder {
    pub fn stage(mut self, spec: StageSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn build(self) -> Result<StageRegistry, RegistryError> {
        StageRegistry::new(self.specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::OutputPort;
    use cascade_core::TensorSpec;

    fn spec(name: &str, handoff: Option<usize>) -> StageSpec {
        let s = StageSpec::new(
            name,
            vec![1u8, 2, 3],
            TensorSpec::int8(16),
            OutputPort::new(0, TensorSpec::float32(2)),
        );
        match handoff {
            Some(n) => s.with_handoff(OutputPort::new(1, TensorSpec::int8(n))),
            None => s,
        }
    }

    #[test]
    fn test_three_stage_registry() {
        let registry = StageRegistry::builder()
            .stage(spec("tiny", Some(16)))
            .stage(spec("small", Some(16)))
            .stage(spec("full", None))
            .build()
            .unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.is_last(2));
        assert!(!registry.is_last(1));
        let names: Vec<&str> = registry.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["tiny", "small", "full"]);
        assert_eq!(registry.get(1).map(|s| s.index()), Some(1));
        assert!(registry.get(3).is_none());
        assert!(registry.get(0).unwrap().blob_hash().starts_with("blake3:"));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(StageRegistry::new(vec![]), Err(RegistryError::Empty));
    }

    #[test]
    fn test_missing_handoff_rejected() {
        let err = StageRegistry::new(vec![spec("a", None), spec("b", None)]).unwrap_err();
        assert_eq!(err, RegistryError::MissingHandoff { stage: 0 });
    }

    #[test]
    fn test_float_handoff_rejected() {
        let bad = spec("a", None).with_handoff(OutputPort::new(1, TensorSpec::float32(4)));
        let err = StageRegistry::new(vec![bad, spec("b", None)]).unwrap_err();
        assert!(matches!(err, RegistryError::HandoffNotQuantized { stage: 0, .. }));
    }

    #[test]
    fn test_quantized_logits_rejected() {
        let mut bad = spec("a", None);
        bad.logits = OutputPort::new(0, TensorSpec::int8(2));
        assert!(matches!(
            StageRegistry::new(vec![bad]),
            Err(RegistryError::LogitsNotFloat { stage: 0, .. })
        ));
    }

    #[test]
    fn test_shared_output_rejected() {
        let bad = spec("a", None).with_handoff(OutputPort::new(0, TensorSpec::int8(4)));
        assert!(matches!(
            StageRegistry::new(vec![bad, spec("b", None)]),
            Err(RegistryError::SharedOutput { stage: 0, tensor: 0 })
        ));
    }

    #[test]
    fn test_oversized_tensors_rejected() {
        let mut bad = spec("a", Some(16));
        bad.input = TensorSpec::float32(usize::MAX / 2);
        assert_eq!(
            StageRegistry::new(vec![bad, spec("b", None)]),
            Err(RegistryError::TooLarge {
                stage: 0,
                role: TensorRole::Input,
                count: usize::MAX / 2,
            })
        );

        let mut bad = spec("b", None);
        bad.logits = OutputPort::new(0, TensorSpec::float32(usize::MAX));
        assert!(matches!(
            StageRegistry::new(vec![spec("a", Some(16)), bad]),
            Err(RegistryError::TooLarge { stage: 1, role: TensorRole::Logits, .. })
        ));
    }

    #[test]
    fn test_empty_blob_rejected() {
        let mut bad = spec("a", None);
        bad.blob.clear();
        assert!(matches!(
            StageRegistry::new(vec![bad]),
            Err(RegistryError::EmptyBlob { stage: 0, .. })
        ));
    }

    #[test]
    fn test_decision_indices() {
        let registry = StageRegistry::new(vec![spec("only", None)]).unwrap();
        assert!(registry.check_decision_indices(1, 0).is_ok());
        assert_eq!(
            registry.check_decision_indices(2, 0),
            Err(RegistryError::DecisionIndex { stage: 0, index: 2, count: 2 })
        );
    }

    #[test]
    fn test_stage_count() {
        let registry = StageRegistry::new(vec![spec("only", None)]).unwrap();
        assert!(registry.check_stage_count(None).is_ok());
        assert!(registry.check_stage_count(Some(1)).is_ok());
        assert_eq!(
            registry.check_stage_count(Some(3)),
            Err(RegistryError::StageCount { expected: 3, actual: 1 })
        );
    }
}
