//! vernetzen command-line entry point.
//!
//! Reads a document from a file or stdin and writes the linked document to
//! stdout. Logging goes to stderr so the output can be piped.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;
use vernetzen_client::{AnnotationPipeline, FilterParams};
use vernetzen_core::{AppConfig, FingerprintCache};

mod args;

use args::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = AppConfig::load().context("loading configuration")?;
    tracing::debug!(backend = ?config.cache_backend, cache_dir = %config.cache_dir.display(), "configuration loaded");
    let pipeline = AnnotationPipeline::from_config(&config)
        .await
        .context("building annotation pipeline")?;

    match cli.cmd {
        Command::Annotate(args) => {
            let input = read_input(args.input.as_deref()).await?;
            let params: FilterParams = args.params.into_iter().collect();
            let output = pipeline.run(&input, &params).await;

            let mut stdout = tokio::io::stdout();
            stdout.write_all(output.as_bytes()).await?;
            stdout.flush().await?;
        }
        Command::Purge(args) => {
            let days = args.days.unwrap_or(pipeline.default_cache_days());
            match pipeline.cache().purge_if_due(days).await? {
                Some(deleted) => println!("purged {deleted} entries"),
                None => println!("no purge due"),
            }
        }
        Command::Key(args) => {
            let input = read_input(args.input.as_deref()).await?;
            println!("{}", pipeline.cache().key_for(input.trim()));
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}
