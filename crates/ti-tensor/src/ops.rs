use crate::error::{Result, TensorError};

/// Numerically stable softmax over the whole slice.
///
/// result[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))
///
/// An empty input yields an empty output.
pub fn softmax(x: &[f32]) -> Vec<f32> {
    if x.is_empty() {
        return Vec::new();
    }

    // Find max for numerical stability
    let max_val = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let exps: Vec<f32> = x.iter().map(|&v| (v - max_val).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Softmax applied independently to consecutive chunks of `group` elements.
///
/// With `group == 2` this normalizes each adjacent (negative, positive)
/// logit pair of a per-token two-class output.
pub fn softmax_chunks(x: &[f32], group: usize) -> Result<Vec<f32>> {
    if group == 0 {
        return Err(TensorError::Other(
            "softmax: group size must be > 0".to_string(),
        ));
    }
    if x.len() % group != 0 {
        return Err(TensorError::Other(format!(
            "softmax: x.len()={} is not a multiple of group={}",
            x.len(),
            group
        )));
    }

    let mut result = Vec::with_capacity(x.len());
    for chunk in x.chunks_exact(group) {
        result.extend(softmax(chunk));
    }
    Ok(result)
}

/// Index of the largest value; ties resolve to the lowest index.
/// Returns `None` for an empty slice.
pub fn argmax(x: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in x.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// The `k` largest values with their indices, highest first.
pub fn top_k(x: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = x.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    indexed.truncate(k);
    indexed
}
