// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per checkpoint interval when telemetry is
// enabled in the config.
//
// Output file: {logs_path}/metrics.csv
//
//   step,step_time,train_loss,train_perplexity,val_perplexity,saved
//   200,0.412300,6.022200,412.551000,389.120000,true
//   400,0.409800,5.303300,201.004000,214.880000,true
//
// The header is written once; later runs append to the same file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

const HEADER: &str = "step,step_time,train_loss,train_perplexity,val_perplexity,saved";

/// One checkpoint interval's summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub step:             usize,
    /// Average seconds per step over the interval
    pub step_time:        f64,
    /// Average step loss over the interval
    pub train_loss:       f64,
    pub train_perplexity: f64,
    /// Aggregate over non-empty validation buckets
    pub val_perplexity:   f64,
    /// Whether this interval produced a new best checkpoint
    pub saved:            bool,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create logs directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &CheckpointMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{}",
            m.step, m.step_time, m.train_loss, m.train_perplexity, m.val_perplexity, m.saved,
        )?;

        tracing::debug!("Logged step {} metrics", m.step);
        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(step: usize, saved: bool) -> CheckpointMetrics {
        CheckpointMetrics {
            step,
            step_time: 0.5,
            train_loss: 3.0,
            train_perplexity: 20.0,
            val_perplexity: 25.0,
            saved,
        }
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&row(200, true)).unwrap();
        // a second run appends under the same header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&row(400, false)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "200,0.500000,3.000000,20.000000,25.000000,true");
        assert!(lines[2].starts_with("400,") && lines[2].ends_with(",false"));
    }
}
