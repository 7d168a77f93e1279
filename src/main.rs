#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod data;
mod ml;
mod infra;

use anyhow::Result;
use cli::Cli;
use clap::Parser;
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};

fn main() -> Result<()> {
    let default_directive: Directive = "seq2seq_chat=info".parse()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy()
                .add_directive(default_directive),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
