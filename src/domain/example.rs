// ============================================================
// Layer 3 — Example and Bucket Domain Types
// ============================================================
// A dialogue pair is stored as two id sequences: the utterance
// (source) and the reply (target). Pairs are grouped into length
// buckets so every batch is padded to a small fixed width.
//
// Example with buckets [(5, 10), (10, 15)]:
//   source len 3, target len 8  → bucket 0
//   source len 7, target len 4  → bucket 1  (7 is not < 5)
//   source len 12               → dropped   (no bucket fits)

use serde::{Deserialize, Serialize};

/// Padding filler.
pub const PAD_ID: u32 = 0;
/// Decoder start marker.
pub const GO_ID: u32 = 1;
/// End of sequence marker, appended to every target.
pub const EOS_ID: u32 = 2;
/// Out-of-vocabulary marker.
pub const UNK_ID: u32 = 3;

/// Reserved tokens in id order. Vocabulary files start with these.
pub const RESERVED_TOKENS: [&str; 4] = ["_PAD", "_GO", "_EOS", "_UNK"];

/// Capacity of one length bucket.
///
/// Both bounds are exclusive: an example fits when
/// `source.len() < source_len && target.len() < target_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub source_len: usize,
    pub target_len: usize,
}

impl BucketSpec {
    pub fn new(source_len: usize, target_len: usize) -> Self {
        Self { source_len, target_len }
    }

    /// True if a pair with these lengths may live in this bucket
    pub fn fits(&self, source_len: usize, target_len: usize) -> bool {
        source_len < self.source_len && target_len < self.target_len
    }
}

/// Index of the first bucket able to hold the given lengths.
pub fn assign_bucket(buckets: &[BucketSpec], source_len: usize, target_len: usize) -> Option<usize> {
    buckets.iter().position(|b| b.fits(source_len, target_len))
}

/// Index of the smallest bucket whose source capacity exceeds `source_len`.
/// Used at inference time when the reply length is unknown.
pub fn bucket_for_source(buckets: &[BucketSpec], source_len: usize) -> Option<usize> {
    buckets.iter().position(|b| b.source_len > source_len)
}

/// One tokenized dialogue pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Utterance token ids (after trimming)
    pub source: Vec<u32>,

    /// Reply token ids, always terminated by EOS_ID
    pub target: Vec<u32>,

    /// Loss weight of this example. 1.0 for primary and validation
    /// data, lower for the secondary corpus.
    pub weight: f32,
}

impl Example {
    pub fn new(source: Vec<u32>, target: Vec<u32>, weight: f32) -> Self {
        Self { source, target, weight }
    }
}
