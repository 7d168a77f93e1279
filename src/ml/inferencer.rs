// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Interactive greedy decoding, one utterance at a time.
//
//   "> " prompt ─▶ tokenize ─▶ smallest bucket with source_len > n
//        │                          │ none fits
//        │                          ▼
//        │                    "too long" message, re-prompt
//        ▼
//   one-row inference batch ─▶ free-running decoder (argmax fed back)
//        ─▶ argmax per timestep ─▶ cut at first EOS ─▶ print tokens
//
// EOF on stdin ends the session.

use anyhow::Result;
use burn::prelude::*;
use std::io::{BufRead, Write};

use crate::data::batcher::BatchBuilder;
use crate::domain::batch::Seq2SeqBatch;
use crate::domain::example::{bucket_for_source, BucketSpec, EOS_ID};
use crate::domain::traits::{ResponseGenerator, TokenCodec};
use crate::ml::model::{BatchTensors, Seq2SeqModel};

pub type InferBackend = burn::backend::Wgpu;

pub const PROMPT: &str = "> ";
pub const TOO_LONG: &str = "Your input was too long. Please try a shorter sentence.";

/// Prefix of `ids` before the first EOS (all of it if there is none).
pub fn truncate_at_eos(ids: &[u32]) -> &[u32] {
    match ids.iter().position(|&id| id == EOS_ID) {
        Some(end) => &ids[..end],
        None      => ids,
    }
}

// ─── Seq2SeqResponder ─────────────────────────────────────────────────────────
/// Greedy decoding with a trained model on a non-autodiff backend.
pub struct Seq2SeqResponder<B: Backend> {
    model:  Seq2SeqModel<B>,
    device: B::Device,
}

impl<B: Backend> Seq2SeqResponder<B> {
    pub fn new(model: Seq2SeqModel<B>, device: B::Device) -> Self {
        Self { model, device }
    }
}

impl<B: Backend> ResponseGenerator for Seq2SeqResponder<B> {
    fn generate(&self, batch: &Seq2SeqBatch, _bucket: BucketSpec) -> Result<Vec<u32>> {
        let tensors = BatchTensors::<B>::from_batch(batch, &self.device);
        let ids = self.model.greedy(tensors.encoder_inputs, tensors.decoder_inputs);

        // single-row batch: [1, target_len] flattens to the sequence
        Ok(ids.into_data().iter::<i64>().map(|id| id as u32).collect())
    }
}

// ─── InteractiveDecoder ───────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Response(String),
    TooLong,
}

pub struct InteractiveDecoder<'a, G, T> {
    generator: &'a G,
    codec:     &'a T,
    buckets:   Vec<BucketSpec>,
    builder:   BatchBuilder,
}

impl<'a, G: ResponseGenerator, T: TokenCodec> InteractiveDecoder<'a, G, T> {
    pub fn new(generator: &'a G, codec: &'a T, buckets: &[BucketSpec]) -> Self {
        Self {
            generator,
            codec,
            buckets: buckets.to_vec(),
            builder: BatchBuilder::new(buckets),
        }
    }

    /// Decode one utterance.
    pub fn respond(&self, sentence: &str) -> Result<Reply> {
        let ids = self.codec.encode(sentence)?;
        let Some(bucket_id) = bucket_for_source(&self.buckets, ids.len()) else {
            return Ok(Reply::TooLong);
        };

        let batch   = self.builder.build_inference(bucket_id, &ids);
        let outputs = self.generator.generate(&batch, self.buckets[bucket_id])?;
        tracing::debug!("bucket {} untrimmed output {:?}", bucket_id, outputs);

        Ok(Reply::Response(self.codec.render(truncate_at_eos(&outputs))))
    }

    /// Prompt, read, respond until `input` is exhausted.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<()> {
        writeln!(output, "Your query: ")?;
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(());
            }

            match self.respond(&line)? {
                Reply::Response(text) => {
                    writeln!(output, "Response: ")?;
                    writeln!(output, "{text}")?;
                }
                Reply::TooLong => writeln!(output, "{TOO_LONG}")?,
            }
        }
    }
}
