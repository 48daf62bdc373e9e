//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// revcache - revision-checked offline cache
///
/// Drives the offline worker against the configured origin and cache
/// database, and generates map data for the site.
#[derive(Parser, Debug)]
#[command(name = "revcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a URL or site route through the worker
    Fetch(FetchArgs),

    /// Run the activate event and report what was purged
    Activate,

    /// List cache keys
    Keys(KeysArgs),

    /// Delete one entry or clear a whole cache
    Clear(ClearArgs),

    /// Generate the merged map data file from adventure and book data
    GenMaps(GenMapsArgs),
}

#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a route resolved against the configured origin
    pub url: String,

    /// Request destination (document, font, image, script, style, manifest)
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Write the response body to stdout instead of a summary
    #[arg(long)]
    pub body: bool,
}

#[derive(Parser, Debug)]
pub struct KeysArgs {
    /// Only list this cache
    #[arg(long)]
    pub cache_name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Cache to clear
    pub cache_name: String,

    /// Delete only this key
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Parser, Debug)]
pub struct GenMapsArgs {
    /// Site data directory
    #[arg(long, default_value = "data", env = "REVCACHE_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Output file [default: <data-dir>/generated/gendata-maps.json]
    #[arg(long)]
    pub out: Option<PathBuf>,
}
