// ============================================================
// Layer 3 — Seq2Seq Batch
// ============================================================
// One padded batch of id rows, as filled by data::batcher and read
// by the training loop, the model and the decoder.
//
// Rows are stored batch-major ([batch][time]); Burn's step takes
// [batch, time] tensors directly. `time_major()` gives the
// per-timestep column view.

use crate::domain::example::PAD_ID;

/// One padded batch. Built per step and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Seq2SeqBatch {
    /// [batch][source_len]
    pub encoder_inputs: Vec<Vec<u32>>,
    /// [batch][target_len]
    pub decoder_inputs: Vec<Vec<u32>>,
    /// [batch][target_len], 1.0 where the next decoder token is real
    pub target_weights: Vec<Vec<f32>>,
    /// Loss weight of the example behind each row
    pub sample_weights: Vec<f32>,
}

impl Seq2SeqBatch {
    pub fn batch_size(&self) -> usize {
        self.encoder_inputs.len()
    }

    pub fn encoder_len(&self) -> usize {
        self.encoder_inputs.first().map_or(0, Vec::len)
    }

    pub fn decoder_len(&self) -> usize {
        self.decoder_inputs.first().map_or(0, Vec::len)
    }

    /// Loss targets: the decoder inputs shifted left by one, PAD-filled.
    pub fn targets(&self) -> Vec<Vec<u32>> {
        self.decoder_inputs
            .iter()
            .map(|row| {
                let mut shifted: Vec<u32> = row.iter().skip(1).copied().collect();
                shifted.push(PAD_ID);
                shifted
            })
            .collect()
    }

    /// Same data as per-timestep columns, each of length batch_size.
    pub fn time_major(&self) -> (Vec<Vec<u32>>, Vec<Vec<u32>>, Vec<Vec<f32>>) {
        (
            transpose(&self.encoder_inputs),
            transpose(&self.decoder_inputs),
            transpose(&self.target_weights),
        )
    }
}

fn transpose<T: Copy>(rows: &[Vec<T>]) -> Vec<Vec<T>> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width)
        .map(|t| rows.iter().map(|row| row[t]).collect())
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::GO_ID;

    #[test]
    fn test_time_major_layout() {
        let batch = Seq2SeqBatch {
            encoder_inputs: vec![vec![1, 2, 3], vec![4, 5, 6]],
            decoder_inputs: vec![vec![GO_ID, 7], vec![GO_ID, 8]],
            target_weights: vec![vec![1.0, 0.0], vec![1.0, 0.0]],
            sample_weights: vec![1.0, 1.0],
        };
        let (enc, dec, w) = batch.time_major();
        assert_eq!(enc, vec![vec![1, 4], vec![2, 5], vec![3, 6]]);
        assert_eq!(dec, vec![vec![GO_ID, GO_ID], vec![7, 8]]);
        assert_eq!(w, vec![vec![1.0, 1.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_targets_shift_left_and_pad() {
        let batch = Seq2SeqBatch {
            encoder_inputs: vec![vec![1, 2]],
            decoder_inputs: vec![vec![GO_ID, 7, 8]],
            target_weights: vec![vec![1.0, 1.0, 0.0]],
            sample_weights: vec![1.0],
        };
        assert_eq!(batch.targets(), vec![vec![7, 8, PAD_ID]]);
        assert_eq!(batch.batch_size(), 1);
        assert_eq!(batch.encoder_len(), 2);
        assert_eq!(batch.decoder_len(), 3);
    }
}
