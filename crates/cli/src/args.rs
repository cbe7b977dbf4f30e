use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vernetzen", version, about = "Link legal citations through the dejure.org service")]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Annotate a document and print the result
    Annotate(AnnotateArgs),
    /// Delete stale cache entries if a purge is due
    Purge(PurgeArgs),
    /// Print the cache key of a document
    Key(KeyArgs),
}

#[derive(clap::Args, Debug)]
pub struct AnnotateArgs {
    /// Input file (stdin when omitted)
    pub input: Option<PathBuf>,

    /// Filter parameter, e.g. `-p format=schmal -p cache_days=3`
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

#[derive(clap::Args, Debug)]
pub struct PurgeArgs {
    /// TTL in days (configured default when omitted)
    #[arg(long)]
    pub days: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    /// Input file (stdin when omitted)
    pub input: Option<PathBuf>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}
