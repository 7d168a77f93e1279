// ============================================================
// Layer 5 — Seq2Seq Model
// ============================================================
// GRU encoder-decoder over a frozen pretrained embedding matrix.
//
//   encoder ids [b, S] → EmbeddingInjector(GRU) → states [b, S, h]
//   decoder ids [b, T] → EmbeddingInjector(GRU) → h_t
//   Luong dot attention over encoder states → tanh(W [h_t; ctx])
//   → output projection → logits [b, T, vocab]
//
// With feed_previous the decoder only reads GO from the batch and
// then consumes its own argmax, which is how evaluation and
// interactive decoding run. Training feeds the true tokens.
//
// Loss per row: sum(mask * nll) / (sum(mask) + 1e-12), scaled by
// the row's sample weight, averaged over the batch.
//
// Reference: Luong et al. (2015) Effective Approaches to
//            Attention-based NMT

use burn::{
    module::Param,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{log_softmax, softmax},
};

use crate::domain::batch::Seq2SeqBatch;
use crate::domain::error::InjectorError;
use crate::ml::injector::{EmbeddingInjector, GruCell, GruCellConfig, RecurrentCell};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Seq2SeqModelConfig {
    pub vocab_size:      usize,
    pub embedding_width: usize,
    pub layer_size:      usize,
}

impl Seq2SeqModelConfig {
    /// Build a fresh model around a pretrained [vocab_size, embedding_width] matrix.
    /// The matrix is stored as a frozen parameter; everything else is trainable.
    pub fn init<B: Backend>(
        &self,
        embeddings: Tensor<B, 2>,
        device:     &B::Device,
    ) -> Result<Seq2SeqModel<B>, InjectorError> {
        let [rows, _] = embeddings.dims();
        if rows != self.vocab_size {
            return Err(InjectorError::VocabMismatch { expected: self.vocab_size, actual: rows });
        }

        let cell_cfg = GruCellConfig::new(self.embedding_width, self.layer_size);
        let encoder: GruCell<B> = cell_cfg.init(device);
        let decoder: GruCell<B> = cell_cfg.init(device);

        // Shape checks happen once here; forward passes reuse them.
        EmbeddingInjector::new(&encoder, embeddings.clone(), self.embedding_width)?;
        EmbeddingInjector::new(&decoder, embeddings.clone(), self.embedding_width)?;

        Ok(Seq2SeqModel {
            embeddings: Param::from_tensor(embeddings).set_require_grad(false),
            encoder,
            decoder,
            attention_combine: LinearConfig::new(2 * self.layer_size, self.layer_size).init(device),
            output_projection: LinearConfig::new(self.layer_size, self.vocab_size).init(device),
        })
    }
}

/// GRU encoder-decoder with dot-product attention over encoder outputs.
#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub embeddings:        Param<Tensor<B, 2>>,
    pub encoder:           GruCell<B>,
    pub decoder:           GruCell<B>,
    pub attention_combine: Linear<B>,
    pub output_projection: Linear<B>,
}

/// A Seq2SeqBatch moved onto a device.
pub struct BatchTensors<B: Backend> {
    pub encoder_inputs: Tensor<B, 2, Int>,
    pub decoder_inputs: Tensor<B, 2, Int>,
    pub targets:        Tensor<B, 2, Int>,
    pub target_weights: Tensor<B, 2>,
    pub sample_weights: Tensor<B, 1>,
}

impl<B: Backend> BatchTensors<B> {
    pub fn from_batch(batch: &Seq2SeqBatch, device: &B::Device) -> Self {
        let b = batch.batch_size();
        let enc_len = batch.encoder_len();
        let dec_len = batch.decoder_len();

        Self {
            encoder_inputs: int_matrix(&batch.encoder_inputs, [b, enc_len], device),
            decoder_inputs: int_matrix(&batch.decoder_inputs, [b, dec_len], device),
            targets:        int_matrix(&batch.targets(), [b, dec_len], device),
            target_weights: {
                let flat: Vec<f32> = batch.target_weights.iter().flatten().copied().collect();
                Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([b, dec_len])
            },
            sample_weights: Tensor::<B, 1>::from_floats(batch.sample_weights.as_slice(), device),
        }
    }
}

fn int_matrix<B: Backend>(rows: &[Vec<u32>], shape: [usize; 2], device: &B::Device) -> Tensor<B, 2, Int> {
    let flat: Vec<i32> = rows.iter().flatten().map(|&x| x as i32).collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape(shape)
}

impl<B: Backend> Seq2SeqModel<B> {
    pub fn vocab_size(&self) -> usize {
        self.embeddings.val().dims()[0]
    }

    fn injector<'a>(&self, cell: &'a GruCell<B>) -> EmbeddingInjector<'a, B, GruCell<B>> {
        EmbeddingInjector::from_validated(cell, self.embeddings.val())
    }

    /// encoder_inputs: [batch, source_len] → outputs [batch, source_len, H], final state [batch, H]
    pub fn encode(&self, encoder_inputs: Tensor<B, 2, Int>) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let [batch, len] = encoder_inputs.dims();
        let cell = self.injector(&self.encoder);

        let mut state   = cell.init_state(batch, &encoder_inputs.device());
        let mut outputs = Vec::with_capacity(len);
        for t in 0..len {
            let ids = encoder_inputs.clone().narrow(1, t, 1).reshape([batch]);
            let (out, next) = cell.step(ids, state);
            outputs.push(out);
            state = next;
        }
        (Tensor::stack::<3>(outputs, 1), state)
    }

    /// Luong dot attention: score each encoder position against the decoder
    /// output, blend the encoder outputs, and mix the context back in.
    fn attend(&self, encoder_outputs: Tensor<B, 3>, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _, h] = encoder_outputs.dims();

        let scores  = encoder_outputs.clone().matmul(hidden.clone().reshape([batch, h, 1])); // [b, T, 1]
        let weights = softmax(scores, 1);
        let context = weights.swap_dims(1, 2).matmul(encoder_outputs).reshape([batch, h]);

        self.attention_combine
            .forward(Tensor::cat(vec![hidden, context], 1))
            .tanh()
    }

    /// Logits over the vocabulary for every decoder position: [batch, target_len, vocab].
    ///
    /// With `feed_previous` the decoder consumes its own argmax after the
    /// leading GO instead of the given decoder inputs.
    pub fn forward(
        &self,
        encoder_inputs: Tensor<B, 2, Int>,
        decoder_inputs: Tensor<B, 2, Int>,
        feed_previous:  bool,
    ) -> Tensor<B, 3> {
        let (encoder_outputs, mut state) = self.encode(encoder_inputs);
        let [batch, len] = decoder_inputs.dims();
        let cell = self.injector(&self.decoder);

        let mut ids    = decoder_inputs.clone().narrow(1, 0, 1).reshape([batch]);
        let mut logits = Vec::with_capacity(len);
        for t in 0..len {
            let (out, next) = cell.step(ids.clone(), state);
            state = next;

            let step_logits = self
                .output_projection
                .forward(self.attend(encoder_outputs.clone(), out));

            if t + 1 < len {
                ids = if feed_previous {
                    step_logits.clone().argmax(1).reshape([batch])
                } else {
                    decoder_inputs.clone().narrow(1, t + 1, 1).reshape([batch])
                };
            }
            logits.push(step_logits);
        }
        Tensor::stack::<3>(logits, 1)
    }

    /// Weighted sequence cross-entropy.
    ///
    /// Each row's masked NLL is normalised by its mask total, scaled by the
    /// row's sample weight, and the rows are averaged.
    pub fn loss(
        &self,
        logits:         Tensor<B, 3>,
        targets:        Tensor<B, 2, Int>,
        target_weights: Tensor<B, 2>,
        sample_weights: Tensor<B, 1>,
    ) -> Tensor<B, 1> {
        let [batch, len, vocab] = logits.dims();

        let log_probs = log_softmax(logits.reshape([batch * len, vocab]), 1);
        let nll = log_probs
            .gather(1, targets.reshape([batch * len, 1]))
            .neg()
            .reshape([batch, len]);

        let masked  = (nll * target_weights.clone()).sum_dim(1).reshape([batch]);
        let counted = target_weights.sum_dim(1).reshape([batch]).add_scalar(1e-12);

        (masked / counted * sample_weights).sum().div_scalar(batch as f32)
    }

    pub fn forward_loss(&self, tensors: BatchTensors<B>, feed_previous: bool) -> Tensor<B, 1> {
        let logits = self.forward(tensors.encoder_inputs, tensors.decoder_inputs, feed_previous);
        self.loss(logits, tensors.targets, tensors.target_weights, tensors.sample_weights)
    }

    /// Greedy decode: argmax token at each position, [batch, target_len].
    pub fn greedy(&self, encoder_inputs: Tensor<B, 2, Int>, decoder_inputs: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        let logits = self.forward(encoder_inputs, decoder_inputs, true);
        let [batch, len, _] = logits.dims();
        logits.argmax(2).reshape([batch, len])
    }
}
