// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads line-aligned id files into a BucketedDataset.
//
// File format (one sentence per line, ids separated by spaces):
//   train.enc.ids          train.dec.ids
//   12 7 430               88 9 13 4
//   5 5                    61
//
// Rules applied per pair:
//   primary    → trim source + target, append EOS, skip degenerate
//                pairs (empty source or EOS-only target), weight 1.0
//   validation → same as primary
//   secondary  → no trimming, no degeneracy filter, append EOS,
//                weight = secondary_weight; appended after the
//                primary examples of each bucket
//
// Pairs that fit no bucket are dropped. Malformed ids, ids outside
// the embedding vocabulary and files of different length are fatal
// DataErrors.
//
// Why check ids against the vocabulary here?
//   The model looks each id up as a row of the embedding matrix.
//   An id past the last row panics on NdArray and reads garbage on
//   Wgpu, so it has to be rejected before a tensor is ever built.

use anyhow::Result;
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use crate::application::config::Seq2SeqConfig;
use crate::data::dataset::BucketedDataset;
use crate::data::trimmer::trimmer_for;
use crate::domain::error::DataError;
use crate::domain::example::{Example, EOS_ID};
use crate::domain::traits::SequenceTrimmer;

/// Progress is logged every this many lines
const PROGRESS_EVERY: usize = 100_000;

// ─── IdPairReader ─────────────────────────────────────────────────────────────
/// Walks two parallel id files in lockstep.
pub struct IdPairReader {
    source_path: PathBuf,
    target_path: PathBuf,
    vocab_size:  usize,
}

impl IdPairReader {
    /// Every id read must be below `vocab_size`.
    pub fn new(
        source_path: impl Into<PathBuf>,
        target_path: impl Into<PathBuf>,
        vocab_size:  usize,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: target_path.into(),
            vocab_size,
        }
    }

    /// Call `f` with every (source_ids, target_ids) pair.
    /// Returns the number of lines read.
    pub fn for_each_pair<F>(&self, mut f: F) -> Result<usize, DataError>
    where
        F: FnMut(Vec<u32>, Vec<u32>),
    {
        let mut sources = open_lines(&self.source_path)?;
        let mut targets = open_lines(&self.target_path)?;
        let mut counter = 0usize;

        loop {
            let source = next_line(&mut sources, &self.source_path)?;
            let target = next_line(&mut targets, &self.target_path)?;

            let (source, target) = match (source, target) {
                (Some(s), Some(t)) => (s, t),
                (None, None)       => break,
                (Some(_), None) => {
                    let rest = sources.by_ref().count();
                    return Err(self.mismatch(counter + 1 + rest, counter));
                }
                (None, Some(_)) => {
                    let rest = targets.by_ref().count();
                    return Err(self.mismatch(counter, counter + 1 + rest));
                }
            };

            counter += 1;
            if counter % PROGRESS_EVERY == 0 {
                tracing::info!("  reading data line {}", counter);
            }

            let source_ids = parse_ids(&source, &self.source_path, counter, self.vocab_size)?;
            let target_ids = parse_ids(&target, &self.target_path, counter, self.vocab_size)?;
            f(source_ids, target_ids);
        }

        Ok(counter)
    }

    fn mismatch(&self, source_lines: usize, target_lines: usize) -> DataError {
        DataError::LengthMismatch {
            source_path: self.source_path.clone(),
            source_lines,
            target_path: self.target_path.clone(),
            target_lines,
        }
    }
}

fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>, DataError> {
    let file = File::open(path).map_err(|cause| DataError::Io {
        path: path.to_path_buf(),
        cause,
    })?;
    Ok(BufReader::new(file).lines())
}

fn next_line(lines: &mut Lines<BufReader<File>>, path: &Path) -> Result<Option<String>, DataError> {
    lines
        .next()
        .transpose()
        .map_err(|cause| DataError::Io { path: path.to_path_buf(), cause })
}

/// Parse one whitespace separated line of token ids, each below `vocab_size`.
pub fn parse_ids(
    line:       &str,
    path:       &Path,
    line_no:    usize,
    vocab_size: usize,
) -> Result<Vec<u32>, DataError> {
    line.split_whitespace()
        .map(|tok| {
            let id = tok.parse::<u32>().map_err(|_| DataError::MalformedLine {
                path:  path.to_path_buf(),
                line:  line_no,
                token: tok.to_string(),
            })?;
            if id as usize >= vocab_size {
                return Err(DataError::UnknownId {
                    path: path.to_path_buf(),
                    line: line_no,
                    id,
                    vocab_size,
                });
            }
            Ok(id)
        })
        .collect()
}

// ─── CorpusLoader ─────────────────────────────────────────────────────────────
/// Builds the training and validation datasets described by a config.
///
/// `vocab_size` is the row count of the embedding matrix; every id in
/// every corpus must index one of those rows.
pub struct CorpusLoader<'a> {
    cfg:        &'a Seq2SeqConfig,
    vocab_size: usize,
    trimmer:    Box<dyn SequenceTrimmer>,
}

impl<'a> CorpusLoader<'a> {
    pub fn new(cfg: &'a Seq2SeqConfig, vocab_size: usize) -> Self {
        Self { cfg, vocab_size, trimmer: trimmer_for(cfg.trim_length) }
    }

    /// Use a custom trimming policy instead of the configured one
    pub fn with_trimmer(mut self, trimmer: Box<dyn SequenceTrimmer>) -> Self {
        self.trimmer = trimmer;
        self
    }

    /// Primary corpus, plus the secondary corpus when enabled.
    pub fn read_train_data(&self) -> Result<BucketedDataset> {
        let mut dataset = BucketedDataset::new(&self.cfg.buckets);
        let reader = IdPairReader::new(&self.cfg.train_source, &self.cfg.train_target, self.vocab_size);
        self.ingest_filtered(&mut dataset, &reader)?;

        if self.cfg.use_secondary_corpus {
            self.merge_secondary(&mut dataset)?;
        }

        tracing::info!(
            "Training data: {} examples, bucket sizes {:?}",
            dataset.total_examples(),
            dataset.bucket_sizes()
        );
        Ok(dataset)
    }

    pub fn read_validation_data(&self) -> Result<BucketedDataset> {
        let mut dataset = BucketedDataset::new(&self.cfg.buckets);
        let reader = IdPairReader::new(&self.cfg.dev_source, &self.cfg.dev_target, self.vocab_size);
        self.ingest_filtered(&mut dataset, &reader)?;

        tracing::info!(
            "Validation data: {} examples, bucket sizes {:?}",
            dataset.total_examples(),
            dataset.bucket_sizes()
        );
        Ok(dataset)
    }

    /// Append the secondary corpus with the reduced sample weight.
    pub fn merge_secondary(&self, dataset: &mut BucketedDataset) -> Result<()> {
        let reader = IdPairReader::new(
            &self.cfg.secondary_source,
            &self.cfg.secondary_target,
            self.vocab_size,
        );
        let weight = self.cfg.secondary_weight;
        let mut kept    = 0usize;
        let mut dropped = 0usize;

        let lines = reader.for_each_pair(|source, mut target| {
            target.push(EOS_ID);
            match dataset.insert(Example::new(source, target, weight)) {
                Some(_) => kept += 1,
                None    => dropped += 1,
            }
        })?;

        tracing::info!(
            "Merged secondary corpus: {} of {} pairs kept (weight {})",
            kept, lines, weight
        );
        if dropped > 0 {
            tracing::debug!("{} secondary pairs fit no bucket", dropped);
        }
        Ok(())
    }

    fn ingest_filtered(&self, dataset: &mut BucketedDataset, reader: &IdPairReader) -> Result<()> {
        let mut skipped = 0usize;
        let mut dropped = 0usize;

        let lines = reader.for_each_pair(|source, target| {
            let source = self.trimmer.trim(source);
            let mut target = self.trimmer.trim(target);
            target.push(EOS_ID);

            if source.is_empty() || target.len() == 1 {
                skipped += 1;
                return;
            }
            if dataset.insert(Example::new(source, target, 1.0)).is_none() {
                dropped += 1;
            }
        })?;

        tracing::debug!(
            "Read {} lines: {} degenerate, {} too long for every bucket",
            lines, skipped, dropped
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::trimmer::HeadTrimmer;
    use crate::domain::example::BucketSpec;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    const VOCAB: usize = 100;

    fn write(dir: &TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn config(dir: &TempDir, enc: &str, dec: &str) -> Seq2SeqConfig {
        Seq2SeqConfig {
            buckets:      vec![BucketSpec::new(3, 4), BucketSpec::new(6, 8)],
            train_source: write(dir, "train.enc", enc),
            train_target: write(dir, "train.dec", dec),
            dev_source:   write(dir, "dev.enc", enc),
            dev_target:   write(dir, "dev.dec", dec),
            ..Default::default()
        }
    }

    #[test]
    fn test_buckets_and_eos() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "10 11\n10 11 12 13\n", "20\n20 21 22\n");
        let ds  = CorpusLoader::new(&cfg, VOCAB).read_train_data().unwrap();

        assert_eq!(ds.bucket_sizes(), vec![1, 1]);
        assert_eq!(ds.bucket(0)[0].target, vec![20, EOS_ID]);
        assert_eq!(ds.bucket(1)[0].source, vec![10, 11, 12, 13]);
        assert_eq!(ds.bucket(1)[0].weight, 1.0);
    }

    #[test]
    fn test_degenerate_pairs_skipped() {
        let dir = TempDir::new().unwrap();
        // empty source, empty target, then one good pair
        let cfg = config(&dir, "\n10\n10\n", "20\n\n20\n");
        let ds  = CorpusLoader::new(&cfg, VOCAB).read_train_data().unwrap();
        assert_eq!(ds.total_examples(), 1);
    }

    #[test]
    fn test_too_long_pairs_dropped() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "1 2 3 4 5 6 7\n", "9\n");
        let ds  = CorpusLoader::new(&cfg, VOCAB).read_train_data().unwrap();
        assert_eq!(ds.total_examples(), 0);
    }

    #[test]
    fn test_trimming_applies_before_bucketing() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "1 2 3 4 5 6 7\n", "9\n");
        let ds  = CorpusLoader::new(&cfg, VOCAB)
            .with_trimmer(Box::new(HeadTrimmer::new(2)))
            .read_train_data()
            .unwrap();
        assert_eq!(ds.bucket(0)[0].source, vec![1, 2]);
    }

    #[test]
    fn test_secondary_corpus_appended_after_primary() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir, "10\n", "20\n");
        cfg.use_secondary_corpus = true;
        cfg.secondary_weight     = 0.25;
        // Secondary data is not filtered: the empty source survives.
        cfg.secondary_source = write(&dir, "movie.enc", "\n30\n");
        cfg.secondary_target = write(&dir, "movie.dec", "40\n\n");

        let ds = CorpusLoader::new(&cfg, VOCAB)
            .with_trimmer(Box::new(HeadTrimmer::new(0)))
            .read_train_data()
            .unwrap();

        // The primary pair is trimmed to nothing and skipped; the
        // secondary pairs are untouched.
        let bucket = ds.bucket(0);
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].source, Vec::<u32>::new());
        assert_eq!(bucket[1].target, vec![EOS_ID]);
        assert!(bucket.iter().all(|e| e.weight == 0.25));
    }

    #[test]
    fn test_primary_precedes_secondary_within_bucket() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir, "10\n11\n", "20\n21\n");
        cfg.use_secondary_corpus = true;
        cfg.secondary_source = write(&dir, "movie.enc", "30\n");
        cfg.secondary_target = write(&dir, "movie.dec", "40\n");

        let ds = CorpusLoader::new(&cfg, VOCAB).read_train_data().unwrap();
        let weights: Vec<f32> = ds.bucket(0).iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![1.0, 1.0, 0.5]);
    }

    #[test]
    fn test_malformed_token_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "10\n1x\n", "20\n21\n");
        let err = CorpusLoader::new(&cfg, VOCAB).read_train_data().unwrap_err();
        match err.downcast_ref::<DataError>() {
            Some(DataError::MalformedLine { line, token, .. }) => {
                assert_eq!(*line, 2);
                assert_eq!(token, "1x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_id_outside_vocabulary_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "10\n4 50\n", "20\n21\n");
        let err = CorpusLoader::new(&cfg, 12).read_train_data().unwrap_err();
        match err.downcast_ref::<DataError>() {
            Some(DataError::UnknownId { line, id, vocab_size, .. }) => {
                assert_eq!(*line, 1);
                assert_eq!(*id, 20);
                assert_eq!(*vocab_size, 12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_id_outside_vocabulary_in_validation_and_secondary() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir, "4\n", "5\n");
        cfg.dev_source = write(&dir, "dev.enc", "4 12\n");
        let err = CorpusLoader::new(&cfg, 12).read_validation_data().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::UnknownId { id: 12, .. })
        ));

        cfg.use_secondary_corpus = true;
        cfg.secondary_source = write(&dir, "movie.enc", "3\n");
        cfg.secondary_target = write(&dir, "movie.dec", "99\n");
        let err = CorpusLoader::new(&cfg, 12).read_train_data().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::UnknownId { id: 99, line: 1, .. })
        ));
    }

    #[test]
    fn test_last_vocabulary_id_is_accepted() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "11\n", "11\n");
        let ds  = CorpusLoader::new(&cfg, 12).read_train_data().unwrap();
        assert_eq!(ds.bucket(0)[0].source, vec![11]);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "10\n11\n12\n", "20\n");
        let err = CorpusLoader::new(&cfg, VOCAB).read_train_data().unwrap_err();
        match err.downcast_ref::<DataError>() {
            Some(DataError::LengthMismatch { source_lines, target_lines, .. }) => {
                assert_eq!(*source_lines, 3);
                assert_eq!(*target_lines, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let cfg = Seq2SeqConfig {
            train_source: "/nonexistent/train.enc".to_string(),
            ..Default::default()
        };
        assert!(CorpusLoader::new(&cfg, VOCAB).read_train_data().is_err());
    }

    #[test]
    fn test_reingestion_is_identical() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "10 11\n3\n10 11 12 13\n5 5\n", "20\n4 4\n20 21 22\n6\n");
        let loader = CorpusLoader::new(&cfg, VOCAB);
        let first  = loader.read_train_data().unwrap();
        let second = loader.read_train_data().unwrap();
        assert_eq!(first, second);
    }

    fn arb_buckets() -> impl Strategy<Value = Vec<BucketSpec>> {
        prop::collection::vec((1usize..12, 1usize..12), 1..5)
            .prop_map(|caps| caps.into_iter().map(|(s, t)| BucketSpec::new(s, t)).collect())
    }

    proptest! {
        #[test]
        fn prop_example_lands_in_lowest_fitting_bucket(
            buckets in arb_buckets(),
            pairs in prop::collection::vec((1usize..15, 1usize..15), 1..30),
        ) {
            let mut ds = BucketedDataset::new(&buckets);
            for (i, &(s, t)) in pairs.iter().enumerate() {
                let tag = i as u32;
                let source = vec![tag; s];
                let target = vec![tag; t];
                let placed = ds.insert(Example::new(source, target, 1.0));

                let expected = buckets.iter().position(|b| s < b.source_len && t < b.target_len);
                prop_assert_eq!(placed, expected);
            }

            for (i, &(s, t)) in pairs.iter().enumerate() {
                let tag = i as u32;
                let homes: Vec<usize> = (0..ds.num_buckets())
                    .filter(|&b| ds.bucket(b).iter().any(|e| e.source.first() == Some(&tag)
                        && e.source.len() == s && e.target.len() == t))
                    .collect();
                match buckets.iter().position(|b| s < b.source_len && t < b.target_len) {
                    Some(b) => prop_assert_eq!(homes, vec![b]),
                    None    => prop_assert!(homes.is_empty()),
                }
            }
        }
    }
}
