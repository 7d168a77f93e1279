// ============================================================
// Layer 2 — Seq2Seq Configuration
// ============================================================
// Every tunable of a run lives in this one struct. It is built
// once in the CLI layer (defaults or a JSON file), validated, and
// then passed by reference to every component that needs it:
// ingestion, batching, the model, the trainer and the decoder.
//
// The struct is saved next to the checkpoints as
// train_config.json so `test` rebuilds the same model shape.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::domain::error::ConfigError;
use crate::domain::example::BucketSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Seq2SeqConfig {
    /// Ordered (max_source_len, max_target_len) capacities
    pub buckets: Vec<BucketSpec>,

    pub batch_size:           usize,
    pub steps_per_checkpoint: usize,

    /// Width of the pretrained word vectors
    pub embedding_width: usize,
    /// Hidden size of the encoder and decoder cells
    pub layer_size:      usize,
    pub learning_rate:   f64,
    pub max_gradient_norm: f32,

    // ── corpora ───────────────────────────────────────────────────
    pub train_source: String,
    pub train_target: String,
    pub dev_source:   String,
    pub dev_target:   String,

    pub use_secondary_corpus: bool,
    pub secondary_source:     String,
    pub secondary_target:     String,
    /// Sample weight given to secondary-corpus pairs
    pub secondary_weight:     f32,

    /// Keep at most this many leading tokens of primary sequences
    pub trim_length: Option<usize>,

    // ── collaborators ─────────────────────────────────────────────
    pub vocab_path:       String,
    pub embeddings_path:  String,
    pub embeddings_array: String,

    /// Checkpoints and train_config.json live here
    pub working_directory: String,

    pub emit_telemetry: bool,
    pub logs_path:      String,

    /// Fixed RNG seed for bucket and example sampling
    pub seed: Option<u64>,
}

impl Default for Seq2SeqConfig {
    fn default() -> Self {
        Self {
            buckets: vec![
                BucketSpec::new(5, 10),
                BucketSpec::new(10, 15),
                BucketSpec::new(20, 25),
                BucketSpec::new(40, 50),
            ],
            batch_size:           64,
            steps_per_checkpoint: 200,
            embedding_width:      100,
            layer_size:           256,
            learning_rate:        1e-3,
            max_gradient_norm:    5.0,
            train_source:         "data/train.enc.ids".to_string(),
            train_target:         "data/train.dec.ids".to_string(),
            dev_source:           "data/dev.enc.ids".to_string(),
            dev_target:           "data/dev.dec.ids".to_string(),
            use_secondary_corpus: false,
            secondary_source:     "data/movie.enc.ids".to_string(),
            secondary_target:     "data/movie.dec.ids".to_string(),
            secondary_weight:     0.5,
            trim_length:          None,
            vocab_path:           "data/vocab.txt".to_string(),
            embeddings_path:      "data/glove.npz".to_string(),
            embeddings_array:     "glove".to_string(),
            working_directory:    "working_dir".to_string(),
            emit_telemetry:       false,
            logs_path:            "logs".to_string(),
            seed:                 None,
        }
    }
}

impl Seq2SeqConfig {
    /// Read a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config '{}'", path.display()))?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets.is_empty() {
            return Err(ConfigError::NoBuckets);
        }
        for (index, b) in self.buckets.iter().enumerate() {
            if b.source_len == 0 || b.target_len == 0 {
                return Err(ConfigError::ZeroCapacity { index });
            }
            if index > 0 {
                let prev = self.buckets[index - 1];
                if b.source_len < prev.source_len || b.target_len < prev.target_len {
                    return Err(ConfigError::UnorderedBuckets { index, previous: index - 1 });
                }
            }
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero { name: "batch_size" });
        }
        if self.steps_per_checkpoint == 0 {
            return Err(ConfigError::Zero { name: "steps_per_checkpoint" });
        }
        if self.embedding_width == 0 {
            return Err(ConfigError::Zero { name: "embedding_width" });
        }
        if self.layer_size == 0 {
            return Err(ConfigError::Zero { name: "layer_size" });
        }
        if self.use_secondary_corpus
            && !(self.secondary_weight > 0.0 && self.secondary_weight < 1.0)
        {
            return Err(ConfigError::SecondaryWeight(self.secondary_weight));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Seq2SeqConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_buckets() {
        let cfg = Seq2SeqConfig { buckets: vec![], ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::NoBuckets));
    }

    #[test]
    fn test_rejects_shrinking_buckets() {
        let cfg = Seq2SeqConfig {
            buckets: vec![BucketSpec::new(10, 15), BucketSpec::new(5, 10)],
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::UnorderedBuckets { index: 1, previous: 0 })
        );
    }

    #[test]
    fn test_rejects_zero_interval() {
        let cfg = Seq2SeqConfig { steps_per_checkpoint: 0, ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::Zero { name: "steps_per_checkpoint" }));
    }

    #[test]
    fn test_secondary_weight_checked_only_when_used() {
        let mut cfg = Seq2SeqConfig { secondary_weight: 1.5, ..Default::default() };
        assert!(cfg.validate().is_ok());
        cfg.use_secondary_corpus = true;
        assert_eq!(cfg.validate(), Err(ConfigError::SecondaryWeight(1.5)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{ "batch_size": 8, "buckets": [{"source_len": 3, "target_len": 4}] }"#)
            .unwrap();

        let cfg = Seq2SeqConfig::load(&path).unwrap();
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.buckets, vec![BucketSpec::new(3, 4)]);
        assert_eq!(cfg.steps_per_checkpoint, 200);
    }
}
