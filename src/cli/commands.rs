// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands select the mode: `train` and `test`.
// Both take an optional JSON config; without one the built-in
// defaults are used.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::config::Seq2SeqConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the seq2seq model until interrupted with Ctrl-C
    Train(ConfigArgs),

    /// Chat with the latest checkpoint on stdin/stdout
    Test(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// JSON file with run settings; missing keys use defaults
    #[arg(long)]
    pub config: Option<String>,

    /// Override the working directory for checkpoints
    #[arg(long)]
    pub working_directory: Option<String>,
}

impl ConfigArgs {
    /// Resolve the run configuration. The application layer never sees clap types.
    pub fn resolve(&self) -> Result<Seq2SeqConfig> {
        let mut cfg = match &self.config {
            Some(path) => Seq2SeqConfig::load(path)?,
            None       => Seq2SeqConfig::default(),
        };
        if let Some(dir) = &self.working_directory {
            cfg.working_directory = dir.clone();
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let args = ConfigArgs { config: None, working_directory: Some("runs/a".into()) };
        let cfg  = args.resolve().unwrap();
        assert_eq!(cfg.working_directory, "runs/a");
        assert_eq!(cfg.batch_size, Seq2SeqConfig::default().batch_size);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = ConfigArgs { config: Some("/nonexistent/cfg.json".into()), working_directory: None };
        assert!(args.resolve().is_err());
    }
}
