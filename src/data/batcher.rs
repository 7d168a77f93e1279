// ============================================================
// Layer 4 — Seq2Seq Batch Builder
// ============================================================
// Turns examples from one bucket into a fixed-size padded batch.
//
// For a bucket (source_len = 5, target_len = 5), source [4, 5, 6]
// and target [7, 8, EOS]:
//
//   encoder  [PAD, PAD, 6, 5, 4]      reversed, left-padded
//   decoder  [GO, 7, 8, EOS, PAD]     GO + target, right-padded
//   mask     [1,  1, 1, 0,   0]
//
// The loss at decoder position j is taken against decoder[j + 1],
// so mask[j] is zero when decoder[j + 1] is padding (or does not
// exist) and when decoder[j] itself is padding.
//
// The Seq2SeqBatch itself is a domain type (domain/batch.rs); this
// module only fills it.

use rand::{seq::SliceRandom, Rng};

use crate::data::dataset::BucketedDataset;
use crate::domain::batch::Seq2SeqBatch;
use crate::domain::example::{BucketSpec, Example, GO_ID, PAD_ID};

// ─── BatchBuilder ─────────────────────────────────────────────────────────────
/// Pads examples to the capacity of their bucket.
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    buckets: Vec<BucketSpec>,
}

impl BatchBuilder {
    pub fn new(buckets: &[BucketSpec]) -> Self {
        Self { buckets: buckets.to_vec() }
    }

    pub fn bucket(&self, bucket_id: usize) -> BucketSpec {
        self.buckets[bucket_id]
    }

    /// Draw `batch_size` examples uniformly (with replacement) from one
    /// bucket. Returns None if the bucket holds no examples.
    pub fn build<R: Rng + ?Sized>(
        &self,
        dataset:    &BucketedDataset,
        bucket_id:  usize,
        batch_size: usize,
        rng:        &mut R,
    ) -> Option<Seq2SeqBatch> {
        let examples = dataset.bucket(bucket_id);
        if examples.is_empty() {
            return None;
        }
        let mut drawn: Vec<&Example> = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            drawn.extend(examples.choose(&mut *rng));
        }
        Some(self.assemble(bucket_id, &drawn))
    }

    /// Validation batches are drawn the same way as training batches.
    pub fn build_validation<R: Rng + ?Sized>(
        &self,
        dataset:    &BucketedDataset,
        bucket_id:  usize,
        batch_size: usize,
        rng:        &mut R,
    ) -> Option<Seq2SeqBatch> {
        self.build(dataset, bucket_id, batch_size, rng)
    }

    /// A one-row batch for decoding a single utterance. The target is
    /// unknown, so the decoder row is GO followed by padding and the
    /// mask is all zero.
    pub fn build_inference(&self, bucket_id: usize, source: &[u32]) -> Seq2SeqBatch {
        let example = Example::new(source.to_vec(), Vec::new(), 1.0);
        self.assemble(bucket_id, &[&example])
    }

    fn assemble(&self, bucket_id: usize, examples: &[&Example]) -> Seq2SeqBatch {
        let spec = self.buckets[bucket_id];
        let mut batch = Seq2SeqBatch {
            encoder_inputs: Vec::with_capacity(examples.len()),
            decoder_inputs: Vec::with_capacity(examples.len()),
            target_weights: Vec::with_capacity(examples.len()),
            sample_weights: Vec::with_capacity(examples.len()),
        };

        for example in examples {
            let encoder = encoder_row(&example.source, spec.source_len);
            let decoder = decoder_row(&example.target, spec.target_len);
            let mask    = target_mask(&decoder);
            batch.encoder_inputs.push(encoder);
            batch.decoder_inputs.push(decoder);
            batch.target_weights.push(mask);
            batch.sample_weights.push(example.weight);
        }
        batch
    }
}

/// Reverse the source and left-pad it to `len`.
pub fn encoder_row(source: &[u32], len: usize) -> Vec<u32> {
    let mut row = vec![PAD_ID; len.saturating_sub(source.len())];
    row.extend(source.iter().rev());
    row
}

/// GO + target, right-padded to `len`.
pub fn decoder_row(target: &[u32], len: usize) -> Vec<u32> {
    let mut row = Vec::with_capacity(len);
    row.push(GO_ID);
    row.extend_from_slice(target);
    row.resize(len, PAD_ID);
    row
}

/// 1.0 where decoder[j] is real and decoder[j + 1] exists and is real.
pub fn target_mask(decoder: &[u32]) -> Vec<f32> {
    (0..decoder.len())
        .map(|j| {
            let next_real = decoder.get(j + 1).is_some_and(|&t| t != PAD_ID);
            if decoder[j] != PAD_ID && next_real { 1.0 } else { 0.0 }
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::EOS_ID;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_encoder_reversed_and_left_padded() {
        assert_eq!(encoder_row(&[4, 5, 6], 5), vec![PAD_ID, PAD_ID, 6, 5, 4]);
    }

    #[test]
    fn test_decoder_and_mask() {
        let decoder = decoder_row(&[7, 8, EOS_ID], 5);
        assert_eq!(decoder, vec![GO_ID, 7, 8, EOS_ID, PAD_ID]);
        assert_eq!(target_mask(&decoder), vec![1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_full_width_target_masks_last_position() {
        // No padding at all: the last position has no next token
        let decoder = decoder_row(&[7, EOS_ID], 3);
        assert_eq!(decoder, vec![GO_ID, 7, EOS_ID]);
        assert_eq!(target_mask(&decoder), vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_targets_are_shifted_decoder_inputs() {
        let builder = BatchBuilder::new(&[BucketSpec::new(5, 5)]);
        let mut ds  = BucketedDataset::new(&[BucketSpec::new(5, 5)]);
        ds.insert(Example::new(vec![4, 5, 6], vec![7, 8, EOS_ID], 1.0));

        let mut rng = StdRng::seed_from_u64(1);
        let batch   = builder.build(&ds, 0, 1, &mut rng).unwrap();
        assert_eq!(batch.targets(), vec![vec![7, 8, EOS_ID, PAD_ID, PAD_ID]]);
    }

    #[test]
    fn test_build_draws_only_from_bucket() {
        let specs   = [BucketSpec::new(3, 4), BucketSpec::new(6, 8)];
        let builder = BatchBuilder::new(&specs);
        let mut ds  = BucketedDataset::new(&specs);
        ds.insert(Example::new(vec![1], vec![EOS_ID], 1.0));
        ds.insert(Example::new(vec![2, 2, 2, 2], vec![9, EOS_ID], 0.5));

        let mut rng = StdRng::seed_from_u64(3);
        let batch   = builder.build(&ds, 1, 4, &mut rng).unwrap();

        assert_eq!(batch.batch_size(), 4);
        assert_eq!(batch.encoder_len(), 6);
        assert_eq!(batch.decoder_len(), 8);
        assert!(batch.encoder_inputs.iter().all(|r| r == &vec![0, 0, 2, 2, 2, 2]));
        assert!(batch.sample_weights.iter().all(|&w| w == 0.5));
    }

    #[test]
    fn test_empty_bucket_gives_no_batch() {
        let specs   = [BucketSpec::new(3, 4), BucketSpec::new(6, 8)];
        let builder = BatchBuilder::new(&specs);
        let ds      = BucketedDataset::new(&specs);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(builder.build(&ds, 0, 2, &mut rng).is_none());
    }

    #[test]
    fn test_inference_batch() {
        let builder = BatchBuilder::new(&[BucketSpec::new(5, 4)]);
        let batch   = builder.build_inference(0, &[10, 11]);

        assert_eq!(batch.encoder_inputs, vec![vec![0, 0, 0, 11, 10]]);
        assert_eq!(batch.decoder_inputs, vec![vec![GO_ID, PAD_ID, PAD_ID, PAD_ID]]);
        assert_eq!(batch.target_weights, vec![vec![0.0; 4]]);
    }
}
