// ============================================================
// Layer 5 — Burn Seq2Seq Learner
// ============================================================
// The Seq2SeqStep the training loop drives in production.
//
// Key Burn points:
//   - Training uses an Autodiff backend for gradients
//   - eval_step runs on model.valid() (inner backend, no graph)
//     and lets the decoder feed back its own predictions
//   - Adam with gradient-norm clipping; the optimiser takes the
//     model by value and hands back the updated one
//   - The embedding matrix is a Param with require_grad off, so
//     GradientsParams simply has no entry for it and Adam skips it
//
// Why is the bucket argument unused here?
//   Batches arrive already padded to their bucket's lengths, and
//   the GRU unrolls over whatever width the tensor has. The loop
//   still passes it so a fake can tell buckets apart.
//
// Reference: Burn Book §5 (Custom Training Loop), Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::batch::Seq2SeqBatch;
use crate::domain::example::BucketSpec;
use crate::domain::traits::Seq2SeqStep;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{BatchTensors, Seq2SeqModel};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub struct Seq2SeqLearner<B: AutodiffBackend, O> {
    model:         Seq2SeqModel<B>,
    optim:         O,
    checkpoints:   CheckpointManager,
    learning_rate: f64,
    device:        B::Device,
}

impl<B, O> Seq2SeqLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    pub fn new(
        model:         Seq2SeqModel<B>,
        optim:         O,
        checkpoints:   CheckpointManager,
        learning_rate: f64,
        device:        B::Device,
    ) -> Self {
        Self { model, optim, checkpoints, learning_rate, device }
    }

    #[cfg(test)]
    pub fn model(&self) -> &Seq2SeqModel<B> {
        &self.model
    }
}

impl<B, O> Seq2SeqStep for Seq2SeqLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    fn train_step(&mut self, batch: &Seq2SeqBatch, _bucket: BucketSpec) -> Result<f64> {
        let tensors = BatchTensors::<B>::from_batch(batch, &self.device);
        let loss    = self.model.forward_loss(tensors, false);

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        // Backward pass + Adam update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.learning_rate, self.model.clone(), grads);

        Ok(loss_val)
    }

    fn eval_step(&mut self, batch: &Seq2SeqBatch, _bucket: BucketSpec) -> Result<f64> {
        let model   = self.model.valid();
        let tensors = BatchTensors::<B::InnerBackend>::from_batch(batch, &self.device);
        Ok(model.forward_loss(tensors, true).into_scalar().elem::<f64>())
    }

    fn persist(&mut self, step: usize, best_perplexity: f64) -> Result<()> {
        self.checkpoints.save_model(&self.model, step, best_perplexity)
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
