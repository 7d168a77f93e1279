// ============================================================
// Layer 4 — Bucket Sampler
// ============================================================
// Picks the bucket for each training step with probability
// proportional to how many examples it holds.
//
// Four buckets with 30, 20, 10 and 40 examples (100 total) give
// the cumulative scale
//   [0.3, 0.5, 0.6, 1.0]
// A uniform draw u ∈ [0, 1) selects the first bucket whose scale
// value exceeds u:
//   u = 0.00 → 0     u = 0.35 → 1     u = 0.999 → 3
//
// The scale is computed once per dataset, not per step.

use rand::Rng;

use crate::domain::error::SamplerError;

/// Cumulative share of the data held by buckets `0..=i`.
pub fn distribution(bucket_sizes: &[usize]) -> Result<Vec<f64>, SamplerError> {
    if bucket_sizes.is_empty() {
        return Err(SamplerError::NoBuckets);
    }
    let total: usize = bucket_sizes.iter().sum();
    if total == 0 {
        return Err(SamplerError::EmptyDataset);
    }

    let total = total as f64;
    let mut running = 0usize;
    Ok(bucket_sizes
        .iter()
        .map(|&size| {
            running += size;
            running as f64 / total
        })
        .collect())
}

/// Smallest index whose scale value exceeds `u`.
///
/// Falls back to the last bucket if rounding left the final value
/// a hair under `u`.
pub fn sample_at(scale: &[f64], u: f64) -> usize {
    scale
        .iter()
        .position(|&s| s > u)
        .unwrap_or(scale.len().saturating_sub(1))
}

/// Draw a bucket index proportional to bucket size.
pub fn sample<R: Rng + ?Sized>(scale: &[f64], rng: &mut R) -> usize {
    let u: f64 = rng.gen();
    sample_at(scale, u)
}
