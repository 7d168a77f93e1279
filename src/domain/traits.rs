// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop and the interactive decoder never touch Burn
// or the tokenizer directly. They talk to these traits, which
// Layer 5 (ml) and Layer 6 (infra) implement.
//
//   Seq2SeqStep       → Seq2SeqLearner  (Burn model + Adam + checkpoints)
//   ResponseGenerator → Seq2SeqResponder (Burn model, inference backend)
//   TokenCodec        → VocabStore       (tokenizers WordLevel model)
//   SequenceTrimmer   → HeadTrimmer / NoTrim
//
// Tests swap in small fakes for each of them.

use anyhow::Result;

use crate::domain::batch::Seq2SeqBatch;
use crate::domain::example::BucketSpec;

// ─── Seq2SeqStep ──────────────────────────────────────────────────────────────
/// The model collaborator driven by the training loop.
pub trait Seq2SeqStep {
    /// Run forward + backward + optimiser update on one batch.
    /// Returns the weighted cross-entropy of the batch.
    fn train_step(&mut self, batch: &Seq2SeqBatch, bucket: BucketSpec) -> Result<f64>;

    /// Forward-only loss on a batch (no gradient, decoder feeds
    /// back its own predictions).
    fn eval_step(&mut self, batch: &Seq2SeqBatch, bucket: BucketSpec) -> Result<f64>;

    /// Persist the current parameters together with the step counter.
    /// Must be all-or-nothing from the caller's point of view.
    fn persist(&mut self, step: usize, best_perplexity: f64) -> Result<()>;

    /// Current learning rate, reported in checkpoint statistics
    fn learning_rate(&self) -> f64;
}

// ─── ResponseGenerator ────────────────────────────────────────────────────────
/// Greedy decoding for one inference batch.
pub trait ResponseGenerator {
    /// Return the arg-max token id at every decoder timestep
    /// (untruncated; the caller cuts at EOS).
    fn generate(&self, batch: &Seq2SeqBatch, bucket: BucketSpec) -> Result<Vec<u32>>;
}

// ─── TokenCodec ───────────────────────────────────────────────────────────────
/// Text ↔ token id conversion used by the interactive decoder.
pub trait TokenCodec {
    fn encode(&self, sentence: &str) -> Result<Vec<u32>>;

    /// Render ids back to a space separated sentence
    fn render(&self, ids: &[u32]) -> String;
}

// ─── SequenceTrimmer ──────────────────────────────────────────────────────────
/// Policy applied to primary-corpus sequences before length checks.
pub trait SequenceTrimmer {
    fn trim(&self, ids: Vec<u32>) -> Vec<u32>;
}
