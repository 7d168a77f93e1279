// ============================================================
// Layer 4 — Bucketed Dataset
// ============================================================
// Dialogue pairs grouped by the smallest bucket they fit into.
// Built once at startup by data::loader and only read afterwards.

use serde::{Deserialize, Serialize};

use crate::domain::example::{assign_bucket, BucketSpec, Example};

/// Dialogue pairs partitioned into length buckets.
///
/// Bucket `i` holds only examples that fit `buckets[i]`; within a
/// bucket examples keep their insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketedDataset {
    buckets:  Vec<BucketSpec>,
    examples: Vec<Vec<Example>>,
}

impl BucketedDataset {
    pub fn new(buckets: &[BucketSpec]) -> Self {
        Self {
            buckets:  buckets.to_vec(),
            examples: vec![Vec::new(); buckets.len()],
        }
    }

    /// Append an example to the first bucket it fits.
    /// Returns the bucket index, or None if the example was dropped.
    pub fn insert(&mut self, example: Example) -> Option<usize> {
        let bucket_id = assign_bucket(&self.buckets, example.source.len(), example.target.len())?;
        self.examples[bucket_id].push(example);
        Some(bucket_id)
    }

    pub fn bucket(&self, bucket_id: usize) -> &[Example] {
        &self.examples[bucket_id]
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket_sizes(&self) -> Vec<usize> {
        self.examples.iter().map(Vec::len).collect()
    }

    pub fn total_examples(&self) -> usize {
        self.examples.iter().map(Vec::len).sum()
    }
}
