// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives here.
//
//   injector.rs   — RecurrentCell trait, GRU cell, and the
//                   EmbeddingInjector that feeds token ids
//                   through the frozen pretrained matrix
//
//   model.rs      — GRU encoder-decoder with dot attention,
//                   weighted sequence loss, greedy decoding
//
//   trainer.rs    — step-driven training loop, perplexity
//                   bookkeeping and best-checkpoint policy
//
//   learner.rs    — the Burn/Adam implementation of one
//                   training step, eval step and persist
//
//   inferencer.rs — interactive greedy decoder
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation

/// Recurrent cell abstraction and embedding lookup wrapper
pub mod injector;

/// Encoder-decoder architecture
pub mod model;

/// Training loop with checkpoint policy
pub mod trainer;

/// Burn-backed training step
pub mod learner;

/// Interactive decoding
pub mod inferencer;
