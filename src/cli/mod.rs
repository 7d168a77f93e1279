// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   seq2seq-chat train [--config run.json]
//   seq2seq-chat test  [--config run.json]
//
// Training runs until Ctrl-C; the handler only raises the stop
// token and the loop exits at the next step boundary.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ConfigArgs};

use crate::ml::trainer::StopToken;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-chat",
    version = "0.1.0",
    about = "Train a bucketed seq2seq chatbot on pretrained embeddings, then chat with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Test(args)  => run_test(args),
        }
    }
}

fn run_train(args: ConfigArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let cfg  = args.resolve()?;
    let stop = StopToken::new();

    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping after the current step...");
        handler_stop.stop();
    }) {
        tracing::warn!("Could not install Ctrl-C handler: {e}");
    }

    tracing::info!("Working directory: {}", cfg.working_directory);
    TrainUseCase::new(cfg, stop).execute()?;

    println!("Training stopped.");
    Ok(())
}

fn run_test(args: ConfigArgs) -> Result<()> {
    use crate::application::chat_use_case::ChatUseCase;

    ChatUseCase::new(args.resolve()?).execute()
}
