// ============================================================
// Layer 2 — ChatUseCase
// ============================================================
// Test mode: rebuild the trained model and talk to it on
// stdin/stdout until EOF.
//
// The config saved by `train` in the working directory wins over
// the one given on the command line, so the model is rebuilt with
// the shapes it was trained with.
//
// The vocabulary file and the embedding matrix must have the same
// number of entries: the decoder emits matrix rows as vocabulary
// ids, and user input is encoded into ids that index the matrix.

use anyhow::Result;
use std::io;

use crate::application::config::Seq2SeqConfig;
use crate::application::train_use_case::prepare_model;
use crate::domain::error::InjectorError;
use crate::infra::{
    checkpoint::CheckpointManager,
    embeddings::load_embedding_matrix,
    vocab_store::VocabStore,
};
use crate::ml::inferencer::{InferBackend, InteractiveDecoder, Seq2SeqResponder};

pub struct ChatUseCase {
    config: Seq2SeqConfig,
}

impl ChatUseCase {
    pub fn new(config: Seq2SeqConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let ckpt = CheckpointManager::new(&self.config.working_directory)?;
        let cfg  = match ckpt.load_config()? {
            Some(saved) => {
                tracing::info!("Using configuration saved in '{}'", ckpt.dir().display());
                saved
            }
            None => self.config.clone(),
        };
        cfg.validate()?;

        let matrix = load_embedding_matrix(&cfg.embeddings_path, &cfg.embeddings_array)?;
        let vocab  = VocabStore::load(&cfg.vocab_path)?;
        check_vocabulary(vocab.len(), matrix.rows)?;

        if !ckpt.exists() {
            tracing::warn!("No trained checkpoint found; responses come from untrained parameters");
        }
        let device = burn::backend::wgpu::WgpuDevice::default();
        let (model, _) = prepare_model::<InferBackend>(&cfg, &matrix, &ckpt, &device)?;

        let responder = Seq2SeqResponder::new(model, device);
        let decoder   = InteractiveDecoder::new(&responder, &vocab, &cfg.buckets);

        let stdin = io::stdin();
        decoder.run(stdin.lock(), io::stdout())
    }
}

/// The vocabulary must cover exactly the rows of the embedding matrix.
fn check_vocabulary(vocab_len: usize, matrix_rows: usize) -> Result<(), InjectorError> {
    if vocab_len != matrix_rows {
        return Err(InjectorError::VocabMismatch { expected: vocab_len, actual: matrix_rows });
    }
    Ok(())
}
