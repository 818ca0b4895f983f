use ti_tensor::ops;

use crate::decoder::OutputDecoder;
use crate::error::{DecodeError, Result};
use crate::mode::SoftmaxGrouping;
use crate::output::Output;

/// Converts dequantized logits into probabilities with a numerically
/// stable softmax, per adjacent pair or over the whole vector.
pub struct ProbabilityDecoder {
    top_n: usize,
    grouping: SoftmaxGrouping,
}

impl ProbabilityDecoder {
    pub fn new(top_n: usize, grouping: SoftmaxGrouping) -> Self {
        Self { top_n, grouping }
    }
}

impl OutputDecoder for ProbabilityDecoder {
    fn name(&self) -> &str {
        "probabilities"
    }

    fn wants_dequantized(&self) -> bool {
        true
    }

    fn decode(&self, values: &[f32]) -> Result<Output> {
        if values.is_empty() {
            return Err(DecodeError::EmptyOutput);
        }
        let probs = match self.grouping {
            SoftmaxGrouping::Pairwise => ops::softmax_chunks(values, 2)?,
            SoftmaxGrouping::Full => ops::softmax(values),
        };
        Ok(Output::Probabilities {
            values: probs,
            shown: self.top_n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_pairs_sum_to_one() {
        let d = ProbabilityDecoder::new(5, SoftmaxGrouping::Pairwise);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let a: f32 = rng.gen_range(-50.0..50.0);
            let b: f32 = rng.gen_range(-50.0..50.0);
            let out = d.decode(&[a, b]).unwrap();
            let p = out.probabilities().unwrap();
            assert_relative_eq!(p[0] + p[1], 1.0, epsilon = 1e-5);
            assert!((0.0..=1.0).contains(&p[0]));
            assert!((0.0..=1.0).contains(&p[1]));
        }
    }

    #[test]
    fn test_pairwise_layout() {
        let d = ProbabilityDecoder::new(2, SoftmaxGrouping::Pairwise);
        let out = d.decode(&[0.0, 0.0, 2.0, 0.0]).unwrap();
        let p = out.probabilities().unwrap();
        assert_eq!(p.len(), 4);
        assert_relative_eq!(p[0], 0.5);
        assert!(p[2] > p[3]);
        assert_eq!(out.to_string(), "Probabilities: 0.5000, 0.5000");
        assert!(d.decode(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_full_vector() {
        let d = ProbabilityDecoder::new(3, SoftmaxGrouping::Full);
        let out = d.decode(&[1.0, 2.0, 3.0]).unwrap();
        let p = out.probabilities().unwrap();
        assert_relative_eq!(p.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_eq!(out.top_classes(1)[0].0, 2);
    }

    #[test]
    fn test_empty() {
        let d = ProbabilityDecoder::new(3, SoftmaxGrouping::Full);
        assert!(matches!(d.decode(&[]), Err(DecodeError::EmptyOutput)));
    }
}
