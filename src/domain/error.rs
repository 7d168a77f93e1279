// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed failures raised by the data pipeline, sampler, embedding
// injector and training loop. The application layer wraps them in
// anyhow::Error with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Corpus files that cannot be ingested
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{path}:{line}: '{token}' is not a token id")]
    MalformedLine {
        path:  PathBuf,
        line:  usize,
        token: String,
    },

    #[error("{source_path} has {source_lines} lines but {target_path} has {target_lines}")]
    LengthMismatch {
        source_path:  PathBuf,
        source_lines: usize,
        target_path:  PathBuf,
        target_lines: usize,
    },

    #[error("{path}:{line}: token id {id} is outside the vocabulary of {vocab_size}")]
    UnknownId {
        path:       PathBuf,
        line:       usize,
        id:         u32,
        vocab_size: usize,
    },

    #[error("cannot read '{path}': {cause}")]
    Io {
        path:  PathBuf,
        #[source]
        cause: std::io::Error,
    },
}

/// Bucket distribution failures
#[derive(Debug, Error, PartialEq)]
pub enum SamplerError {
    #[error("cannot build a bucket distribution: dataset is empty")]
    EmptyDataset,

    #[error("no buckets configured")]
    NoBuckets,
}

/// Embedding injector construction failures
#[derive(Debug, Error, PartialEq)]
pub enum InjectorError {
    #[error("embedding matrix width {actual} does not match expected width {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("embedding matrix has no rows")]
    EmptyMatrix,

    #[error("embedding matrix has {actual} rows but the vocabulary has {expected} tokens")]
    VocabMismatch { expected: usize, actual: usize },
}

/// Invalid configuration values, detected before anything is loaded
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("at least one bucket must be configured")]
    NoBuckets,

    #[error("bucket {index} has a zero capacity")]
    ZeroCapacity { index: usize },

    #[error("bucket {index} is not larger than bucket {previous}")]
    UnorderedBuckets { index: usize, previous: usize },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("secondary_weight must be in (0, 1), got {0}")]
    SecondaryWeight(f32),
}

/// Fatal conditions inside the training loop
#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error("step {step}: loss is not finite ({loss})")]
    NonFiniteLoss { step: usize, loss: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataError::MalformedLine {
            path:  PathBuf::from("train.enc"),
            line:  3,
            token: "x1".to_string(),
        };
        assert_eq!(err.to_string(), "train.enc:3: 'x1' is not a token id");

        let err = DataError::UnknownId {
            path:       PathBuf::from("dev.dec"),
            line:       2,
            id:         40,
            vocab_size: 12,
        };
        assert_eq!(err.to_string(), "dev.dec:2: token id 40 is outside the vocabulary of 12");

        let err = ConfigError::Zero { name: "batch_size" };
        assert!(err.to_string().contains("batch_size"));

        let err = TrainingError::NonFiniteLoss { step: 7, loss: f64::NAN };
        assert!(err.to_string().contains("step 7"));
    }
}
