// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate the configuration      (Layer 2)
//   Step 2: Load the embedding matrix       (Layer 6 - infra)
//   Step 3: Ingest train + validation data  (Layer 4 - data)
//   Step 4: Save config next to checkpoints (Layer 6 - infra)
//   Step 5: Restore or create the model     (Layer 5 + 6)
//   Step 6: Run the training loop           (Layer 5 - ml)
//
// The loop only ends when the stop token is set (Ctrl-C) or on a
// fatal error.

use anyhow::Result;
use burn::{
    grad_clipping::GradientClippingConfig,
    optim::AdamConfig,
    prelude::*,
};

use crate::application::config::Seq2SeqConfig;
use crate::data::loader::CorpusLoader;
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointPointer},
    embeddings::{load_embedding_matrix, EmbeddingMatrix},
    metrics::MetricsLogger,
};
use crate::ml::{
    learner::{Seq2SeqLearner, TrainBackend},
    model::{Seq2SeqModel, Seq2SeqModelConfig},
    trainer::{StopToken, TrainingLoop, TrainingState},
};

pub struct TrainUseCase {
    config: Seq2SeqConfig,
    stop:   StopToken,
}

impl TrainUseCase {
    pub fn new(config: Seq2SeqConfig, stop: StopToken) -> Self {
        Self { config, stop }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;
        tracing::info!(
            "Creating GRU seq2seq with {} units, {} buckets",
            cfg.layer_size,
            cfg.buckets.len()
        );

        // ── Step 2: Pretrained embeddings ─────────────────────────────────────
        let matrix = load_embedding_matrix(&cfg.embeddings_path, &cfg.embeddings_array)?;

        // ── Step 3: Corpora ───────────────────────────────────────────────────
        let loader = CorpusLoader::new(cfg, matrix.rows);
        let train  = loader.read_train_data()?;
        let val    = loader.read_validation_data()?;

        // ── Step 4: Working directory ─────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.working_directory)?;
        ckpt.save_config(cfg)?;

        // ── Step 5: Model ─────────────────────────────────────────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        let (model, pointer) = prepare_model::<TrainBackend>(cfg, &matrix, &ckpt, &device)?;
        let state = match pointer {
            Some(p) => TrainingState {
                best_perplexity: p.best_perplexity,
                ..TrainingState::starting_at(p.step)
            },
            None => TrainingState::starting_at(0),
        };

        let optim = AdamConfig::new()
            .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.max_gradient_norm)))
            .init::<TrainBackend, Seq2SeqModel<TrainBackend>>();
        let learner = Seq2SeqLearner::new(model, optim, ckpt, cfg.learning_rate, device);

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let mut training = TrainingLoop::new(cfg, learner, &train, &val, state)?;
        if cfg.emit_telemetry {
            training = training.with_metrics(MetricsLogger::new(&cfg.logs_path)?);
        }

        println!("{}", "=".repeat(70));
        println!("TRAINING");
        println!("{}", "=".repeat(70));
        training.run(&self.stop)?;

        let state = training.state();
        tracing::info!(
            "Stopped at global step {} (best validation perplexity {:.2})",
            state.step,
            state.best_perplexity
        );
        Ok(())
    }
}

/// Build the model around the pretrained matrix and load the newest
/// checkpoint into it when one exists.
///
/// A checkpoint that cannot be read is logged and skipped; training
/// and decoding then start from fresh parameters.
pub fn prepare_model<B: Backend>(
    cfg:    &Seq2SeqConfig,
    matrix: &EmbeddingMatrix,
    ckpt:   &CheckpointManager,
    device: &B::Device,
) -> Result<(Seq2SeqModel<B>, Option<CheckpointPointer>)> {
    let embeddings = Tensor::<B, 1>::from_floats(matrix.values.as_slice(), device)
        .reshape([matrix.rows, matrix.cols]);
    let model = Seq2SeqModelConfig::new(matrix.rows, cfg.embedding_width, cfg.layer_size)
        .init(embeddings, device)?;

    match ckpt.restore(model.clone(), device) {
        Ok(Some((restored, pointer))) => {
            tracing::info!("Restored model at global step {}", pointer.step);
            Ok((restored, Some(pointer)))
        }
        Ok(None) => {
            tracing::info!("Created model with fresh parameters");
            Ok((model, None))
        }
        Err(e) => {
            tracing::warn!("Could not restore checkpoint ({e:#}); using fresh parameters");
            Ok((model, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn matrix() -> EmbeddingMatrix {
        EmbeddingMatrix { rows: 6, cols: 3, values: (0..18).map(|v| v as f32 / 18.0).collect() }
    }

    fn cfg() -> Seq2SeqConfig {
        Seq2SeqConfig { embedding_width: 3, layer_size: 4, ..Default::default() }
    }

    #[test]
    fn test_fresh_model_without_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let (model, pointer) = prepare_model::<TestBackend>(&cfg(), &matrix(), &ckpt, &device).unwrap();
        assert!(pointer.is_none());
        assert_eq!(model.vocab_size(), 6);
    }

    #[test]
    fn test_restores_saved_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let (model, _) = prepare_model::<TestBackend>(&cfg(), &matrix(), &ckpt, &device).unwrap();
        ckpt.save_model(&model, 600, 33.0).unwrap();

        let (_, pointer) = prepare_model::<TestBackend>(&cfg(), &matrix(), &ckpt, &device).unwrap();
        assert_eq!(pointer.map(|p| p.step), Some(600));
    }

    #[test]
    fn test_unreadable_checkpoint_falls_back_to_fresh() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        std::fs::write(dir.path().join("checkpoint.json"), "not json").unwrap();

        let (_, pointer) = prepare_model::<TestBackend>(&cfg(), &matrix(), &ckpt, &device).unwrap();
        assert!(pointer.is_none());
    }

    #[test]
    fn test_width_mismatch_is_fatal() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg    = Seq2SeqConfig { embedding_width: 5, layer_size: 4, ..Default::default() };

        assert!(prepare_model::<TestBackend>(&cfg, &matrix(), &ckpt, &device).is_err());
    }
}
