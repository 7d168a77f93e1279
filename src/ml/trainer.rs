// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven training with perplexity-based best checkpointing.
//
//   RUNNING        sample bucket → build batch → train_step
//                  step_time += dt / interval
//                  loss      += step_loss / interval
//        │ every steps_per_checkpoint steps
//        ▼
//   CHECKPOINTING  train perplexity, one eval batch per non-empty
//                  validation bucket, aggregate, persist on improvement,
//                  reset running averages
//
// Perplexity is exp(loss), saturating to +inf once loss ≥ 300.
// A bucket whose perplexity comes back as zero marks the whole
// aggregate as degenerate (sentinel 10_000_000) and it is never
// saved, whatever the previous best was.
//
// Why sum the bucket perplexities instead of averaging them?
//   The best-so-far comparison only needs an ordering, and the
//   sum keeps every bucket's contribution visible in the log.
//
// Restarts: TrainingState carries the restored global step and
// best perplexity, so checkpoints keep firing on the global
// interval and a worse model never replaces a saved better one.
//
// The loop only talks to the Seq2SeqStep trait, so it runs the
// same over a Burn model or a scripted fake.
//
// Reference: Sutskever et al. (2014) Seq2Seq, Burn Book §5

use anyhow::{anyhow, Result};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use crate::application::config::Seq2SeqConfig;
use crate::data::{batcher::BatchBuilder, dataset::BucketedDataset, sampler};
use crate::domain::error::TrainingError;
use crate::domain::traits::Seq2SeqStep;
use crate::infra::metrics::{CheckpointMetrics, MetricsLogger};

pub const PERPLEXITY_LOSS_CAP: f64 = 300.0;
pub const DEGENERATE_PENALTY: f64 = 10_000_000.0;
pub const INITIAL_BEST_PERPLEXITY: f64 = 100_000_000.0;

/// exp(loss), or +inf when the loss is too large to exponentiate usefully.
pub fn perplexity(loss: f64) -> f64 {
    if loss < PERPLEXITY_LOSS_CAP {
        loss.exp()
    } else {
        f64::INFINITY
    }
}

// ─── Validation aggregate ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationSummary {
    pub total:      f64,
    pub degenerate: bool,
}

impl ValidationSummary {
    /// Sum of per-bucket perplexities. Any zero collapses the whole
    /// aggregate to the penalty.
    pub fn aggregate(perplexities: &[f64]) -> Self {
        if perplexities.iter().any(|&p| p == 0.0) {
            return Self { total: DEGENERATE_PENALTY, degenerate: true };
        }
        Self { total: perplexities.iter().sum(), degenerate: false }
    }

    pub fn improves_on(&self, best: f64) -> bool {
        !self.degenerate && self.total < best
    }
}

// ─── TrainingState ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingState {
    pub step:            usize,
    /// Running average seconds per step since the last checkpoint
    pub step_time:       f64,
    /// Running average loss since the last checkpoint
    pub loss:            f64,
    pub best_perplexity: f64,
}

impl TrainingState {
    pub fn starting_at(step: usize) -> Self {
        Self { step, step_time: 0.0, loss: 0.0, best_perplexity: INITIAL_BEST_PERPLEXITY }
    }

    fn record(&mut self, seconds: f64, loss: f64, interval: usize) {
        self.step_time += seconds / interval as f64;
        self.loss      += loss / interval as f64;
        self.step      += 1;
    }

    fn reset_running(&mut self) {
        self.step_time = 0.0;
        self.loss      = 0.0;
    }
}

// ─── StopToken ────────────────────────────────────────────────────────────────
/// Cooperative stop flag shared with the Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened at one checkpoint boundary
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointReport {
    pub step:             usize,
    pub train_perplexity: f64,
    /// (bucket id, perplexity) for every bucket that had validation data
    pub bucket_perplexities: Vec<(usize, f64)>,
    pub validation:       ValidationSummary,
    pub saved:            bool,
}

// ─── TrainingLoop ─────────────────────────────────────────────────────────────
pub struct TrainingLoop<'a, M: Seq2SeqStep> {
    cfg:        &'a Seq2SeqConfig,
    model:      M,
    train:      &'a BucketedDataset,
    validation: &'a BucketedDataset,
    scale:      Vec<f64>,
    builder:    BatchBuilder,
    state:      TrainingState,
    metrics:    Option<MetricsLogger>,
    rng:        StdRng,
}

impl<'a, M: Seq2SeqStep> TrainingLoop<'a, M> {
    /// Fails if the training set is empty; the bucket distribution is
    /// computed here once.
    pub fn new(
        cfg:        &'a Seq2SeqConfig,
        model:      M,
        train:      &'a BucketedDataset,
        validation: &'a BucketedDataset,
        state:      TrainingState,
    ) -> Result<Self> {
        let scale = sampler::distribution(&train.bucket_sizes())?;
        tracing::info!("Bucket scale: {:?}", scale);

        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };

        Ok(Self {
            cfg,
            model,
            train,
            validation,
            scale,
            builder: BatchBuilder::new(&cfg.buckets),
            state,
            metrics: None,
            rng,
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    #[cfg(test)]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Train until the stop token is set.
    pub fn run(&mut self, stop: &StopToken) -> Result<()> {
        tracing::info!("Training from global step {}", self.state.step);
        while !stop.is_stopped() {
            self.step()?;
            if self.state.step % self.cfg.steps_per_checkpoint == 0 {
                self.checkpoint()?;
            }
        }
        tracing::info!("Stop requested at global step {}", self.state.step);
        Ok(())
    }

    /// One optimiser step on a batch from a randomly chosen bucket.
    pub fn step(&mut self) -> Result<f64> {
        let start     = Instant::now();
        let bucket_id = sampler::sample(&self.scale, &mut self.rng);
        let batch = self
            .builder
            .build(self.train, bucket_id, self.cfg.batch_size, &mut self.rng)
            .ok_or_else(|| anyhow!("sampled bucket {bucket_id} holds no training examples"))?;

        let loss = self.model.train_step(&batch, self.builder.bucket(bucket_id))?;
        if !loss.is_finite() {
            return Err(TrainingError::NonFiniteLoss { step: self.state.step + 1, loss }.into());
        }

        let seconds = start.elapsed().as_secs_f64();
        self.state.record(seconds, loss, self.cfg.steps_per_checkpoint);
        Ok(loss)
    }

    /// Report statistics, evaluate every bucket, persist on improvement.
    pub fn checkpoint(&mut self) -> Result<CheckpointReport> {
        let train_perplexity = perplexity(self.state.loss);
        tracing::info!(
            "global step {} learning rate {:.4} step-time {:.2} perplexity {:.2}",
            self.state.step,
            self.model.learning_rate(),
            self.state.step_time,
            train_perplexity,
        );

        let mut bucket_perplexities = Vec::new();
        for bucket_id in 0..self.validation.num_buckets() {
            let batch = self.builder.build_validation(
                self.validation,
                bucket_id,
                self.cfg.batch_size,
                &mut self.rng,
            );
            let Some(batch) = batch else {
                tracing::info!("  eval: empty bucket {}", bucket_id);
                continue;
            };
            let loss = self.model.eval_step(&batch, self.builder.bucket(bucket_id))?;
            let ppx  = perplexity(loss);
            tracing::info!("  Bucket {}: validation perplexity {:.2}", bucket_id, ppx);
            bucket_perplexities.push((bucket_id, ppx));
        }

        let perplexities: Vec<f64> = bucket_perplexities.iter().map(|&(_, p)| p).collect();
        let validation = ValidationSummary::aggregate(&perplexities);
        if validation.degenerate {
            tracing::warn!("A validation bucket reported zero perplexity; not saving");
        }

        let saved = validation.improves_on(self.state.best_perplexity);
        if saved {
            self.state.best_perplexity = validation.total;
            tracing::info!("BestPerp: {:.2}. Saving model.", validation.total);
            self.model.persist(self.state.step, validation.total)?;
        }

        if let Some(metrics) = &self.metrics {
            metrics.log(&CheckpointMetrics {
                step:             self.state.step,
                step_time:        self.state.step_time,
                train_loss:       self.state.loss,
                train_perplexity,
                val_perplexity:   validation.total,
                saved,
            })?;
        }

        self.state.reset_running();
        Ok(CheckpointReport {
            step: self.state.step,
            train_perplexity,
            bucket_perplexities,
            validation,
            saved,
        })
    }
}
