// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What lives in the working directory:
//   seq2seq_step_200.mpk      ← weights at global step 200
//   seq2seq_step_600.mpk      ← weights at global step 600
//   checkpoint.json           ← pointer to the newest weights
//   train_config.json         ← the Seq2SeqConfig of the run
//
// checkpoint.json is written to a temp file and renamed over the
// old pointer, so a crash mid-save leaves the previous checkpoint
// loadable. Only the newest KEEP_CHECKPOINTS weight files are kept.
//
// Why ask the recorder for the extension?
//   CompactRecorder appends its own extension to the stem we pass.
//   Pruning has to delete exactly that file, so the name is built
//   from FileRecorder::file_extension() rather than hard-coded.
//
// Loading fails when the recorded architecture does not match the
// model it is loaded into (different vocab or layer size).

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::config::Seq2SeqConfig;

const POINTER_FILE: &str = "checkpoint.json";
const CONFIG_FILE:  &str = "train_config.json";
const KEEP_CHECKPOINTS: usize = 5;

/// Contents of checkpoint.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPointer {
    /// Global step the newest weights were saved at
    pub step: usize,
    /// Weight file stem, relative to the working directory
    pub model: String,
    /// Aggregate validation perplexity that triggered the save
    pub best_perplexity: f64,
    /// Retained weight stems, oldest first
    #[serde(default)]
    pub history: Vec<String>,
}

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create working directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// True when a checkpoint pointer exists
    pub fn exists(&self) -> bool {
        self.dir.join(POINTER_FILE).exists()
    }

    /// The file CompactRecorder writes for a weight stem.
    pub fn weight_file<B: Backend>(&self, stem: &str) -> PathBuf {
        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
        self.dir.join(format!("{stem}.{ext}"))
    }

    /// Record model weights for `step`, then move the pointer to them.
    pub fn save_model<B: Backend, M: Module<B>>(
        &self,
        model:           &M,
        step:            usize,
        best_perplexity: f64,
    ) -> Result<()> {
        let stem = format!("seq2seq_step_{step}");
        let path = self.dir.join(&stem);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let mut history = self.latest()?.map(|p| p.history).unwrap_or_default();
        history.retain(|s| s != &stem);
        history.push(stem.clone());
        let expired: Vec<String> = if history.len() > KEEP_CHECKPOINTS {
            history.drain(..history.len() - KEEP_CHECKPOINTS).collect()
        } else {
            Vec::new()
        };

        let pointer = CheckpointPointer { step, model: stem, best_perplexity, history };
        self.write_pointer(&pointer)?;

        for old in expired {
            let file = self.weight_file::<B>(&old);
            if let Err(e) = fs::remove_file(&file) {
                tracing::warn!("Could not remove old checkpoint '{}': {}", file.display(), e);
            }
        }

        tracing::debug!("Saved checkpoint: step {}", step);
        Ok(())
    }

    fn write_pointer(&self, pointer: &CheckpointPointer) -> Result<()> {
        let tmp  = self.dir.join(format!("{POINTER_FILE}.tmp"));
        let path = self.dir.join(POINTER_FILE);

        fs::write(&tmp, serde_json::to_string_pretty(pointer)?)
            .with_context(|| format!("Failed to write '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace '{}'", path.display()))?;
        Ok(())
    }

    /// The current pointer, or None if nothing has been saved yet.
    pub fn latest(&self) -> Result<Option<CheckpointPointer>> {
        let path = self.dir.join(POINTER_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let pointer = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint pointer '{}'", path.display()))?;
        Ok(Some(pointer))
    }

    /// Load the newest weights into `model`.
    ///
    /// Returns Ok(None) when there is no checkpoint to restore.
    pub fn restore<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        device: &B::Device,
    ) -> Result<Option<(M, CheckpointPointer)>> {
        let Some(pointer) = self.latest()? else {
            return Ok(None);
        };
        let path = self.dir.join(&pointer.model);

        tracing::info!("Reading model parameters from '{}'", path.display());

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(Some((model.load_record(record), pointer)))
    }

    /// Save the run configuration so `test` can rebuild the same model.
    pub fn save_config(&self, cfg: &Seq2SeqConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// The configuration saved by the last `train` run, if any.
    pub fn load_config(&self) -> Result<Option<Seq2SeqConfig>> {
        let path = self.dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Seq2SeqConfig::load(&path).map(Some)
    }
}
