//! Probability Normalizer
//!
//! Max-subtracted softmax over a stage's float logits.

use cascade_core::{CascadeError, RawTensor};
use serde::{Deserialize, Serialize};

/// Non-negative values summing to 1, one per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    probs: Vec<f32>,
}

impl ProbabilityDistribution {
    pub fn as_slice(&self) -> &[f32] {
        &self.probs
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn sum(&self) -> f32 {
        self.probs.iter().sum()
    }

    /// Index and probability of the most likely class.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        self.probs
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
    }
}

/// Softmax of a `Float32` logits tensor.
pub fn softmax(tensor: &RawTensor<'_>) -> Result<ProbabilityDistribution, CascadeError> {
    let logits = tensor.to_f32_vec()?;
    softmax_slice(tensor.stage(), &logits)
}

/// Softmax of plain logits attributed to `stage`.
pub fn softmax_slice(stage: usize, logits: &[f32]) -> Result<ProbabilityDistribution, CascadeError> {
    let degenerate = |detail: String| CascadeError::NumericDegenerate { stage, detail };

    if logits.is_empty() {
        return Err(degenerate("no logits".to_string()));
    }
    if logits.iter().any(|l| l.is_nan()) {
        return Err(degenerate("NaN in logits".to_string()));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return Err(degenerate(format!("maximum logit is {}", max)));
    }

    let exps: Vec<f64> = logits.iter().map(|l| ((*l - max) as f64).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(degenerate(format!("sum of exponentials is {}", sum)));
    }

    Ok(ProbabilityDistribution {
        probs: exps.iter().map(|e| (e / sum) as f32).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::tensor::{encode_f32, encode_i8};
    use cascade_core::{ElementType, ErrorKind, TensorRole, TensorSpec};

    fn assert_distribution(dist: &ProbabilityDistribution) {
        assert!((dist.sum() - 1.0).abs() < 1e-5, "sum = {}", dist.sum());
        assert!(dist.as_slice().iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_sums_to_one() {
        let cases: [&[f32]; 6] = [
            &[0.0],
            &[1.0, 2.0, 3.0],
            &[-5.0, 0.5, 12.0, 3.25],
            &[0.0; 10],
            &[-100.0, -101.0],
            &[7.0, f32::NEG_INFINITY, 2.0],
        ];
        for logits in cases {
            let dist = softmax_slice(0, logits).unwrap();
            assert_eq!(dist.len(), logits.len());
            assert_distribution(&dist);
        }
    }

    #[test]
    fn test_large_logits_do_not_overflow() {
        let dist = softmax_slice(0, &[1000.0, 999.0, -1000.0]).unwrap();
        assert_distribution(&dist);
        assert!(dist.as_slice()[0] > dist.as_slice()[1]);
        assert!(dist.as_slice()[2] < 1e-6);
    }

    #[test]
    fn test_uniform_logits() {
        let dist = softmax_slice(0, &[3.0; 4]).unwrap();
        for p in dist.as_slice() {
            assert!((p - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_argmax() {
        let dist = softmax_slice(0, &[0.1, 4.0, 2.0]).unwrap();
        assert_eq!(dist.argmax().map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_tensor_path() {
        let bytes = encode_f32(&[2.0, 2.0]);
        let t = RawTensor::from_bytes(1, TensorRole::Logits, TensorSpec::float32(2), &bytes).unwrap();
        let dist = softmax(&t).unwrap();
        assert!((dist.as_slice()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_quantized_tensor_is_type_mismatch() {
        let bytes = encode_i8(&[1, 2, 3]);
        let t = RawTensor::from_bytes(2, TensorRole::Logits, TensorSpec::int8(3), &bytes).unwrap();
        match softmax(&t) {
            Err(CascadeError::TypeMismatch { stage, expected, got, .. }) => {
                assert_eq!(stage, 2);
                assert_eq!(expected, ElementType::Float32);
                assert_eq!(got, ElementType::Int8);
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let all_neg_inf = [f32::NEG_INFINITY; 3];
        let with_nan = [1.0, f32::NAN];
        let with_pos_inf = [f32::INFINITY, 0.0];
        for logits in [&all_neg_inf[..], &with_nan[..], &with_pos_inf[..], &[][..]] {
            let err = softmax_slice(4, logits).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NumericDegenerate);
            assert_eq!(err.stage(), Some(4));
        }
    }
}
