use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sat-fetch")]
#[command(about = "Download satellite images for geocoded property records", long_about = None)]
pub struct Cli {
    /// Configuration file name (without extension)
    #[arg(long, global = true, default_value = "Config")]
    pub config: String,

    /// Log at debug level (per-record failure reasons)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load train/test records and download missing images
    Fetch {
        /// Override the configured number of workers
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Load train/test records and report counts without downloading
    Load,
    /// Print configuration values
    PrintConfig,
}
