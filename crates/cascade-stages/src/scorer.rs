//! Uncertainty Scorer: Shannon entropy in nats
use crate::normalizer::ProbabilityDistribution;

pub fn entropy(dist: &ProbabilityDistribution) -> f32 {
    entropy_of(dist.as_slice())
}

/// `-Σ p·ln p`, skipping non-positive terms (their limit is 0).
pub fn entropy_of(probs: &[f32]) -> f32 {
    let h: f32 = probs
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.ln())
        .sum();
    h.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::softmax_slice;

    #[test]
    fn test_one_hot_is_zero() {
        assert_eq!(entropy_of(&[0.0, 1.0, 0.0]), 0.0);
        let dist = softmax_slice(0, &[50.0, -50.0, -50.0]).unwrap();
        assert!(entropy(&dist) < 1e-5);
    }

    #[test]
    fn test_uniform_is_ln_k() {
        for k in [2usize, 3, 10, 1000] {
            let dist = softmax_slice(0, &vec![0.5; k]).unwrap();
            let h = entropy(&dist);
            assert!((h - (k as f32).ln()).abs() < 1e-3, "k = {}, h = {}", k, h);
        }
    }

    #[test]
    fn test_uniform_is_maximal() {
        let uniform = entropy(&softmax_slice(0, &[0.0; 4]).unwrap());
        let skewed = entropy(&softmax_slice(0, &[0.0, 1.0, 2.0, 3.0]).unwrap());
        assert!(skewed < uniform);
    }

    #[test]
    fn test_never_negative() {
        assert_eq!(entropy_of(&[]), 0.0);
        assert!(entropy_of(&[1.0]) >= 0.0);
        assert_eq!(entropy_of(&[-0.1, 1.1]), 0.0);
    }
}
