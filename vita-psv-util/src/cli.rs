use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vita-psv-util")]
#[command(about = "PS Vita PSV file utility", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a copy of a PSV file without header and license data
    Strip {
        /// Path to the PSV file
        #[arg(value_name = "PSV_FILE")]
        psv_path: PathBuf,

        /// Output file (defaults to <name>_stripped.psv next to the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Display header, license and copy plan of a PSV file
    Info {
        /// Path to the PSV file
        #[arg(value_name = "PSV_FILE")]
        psv_path: PathBuf,
    },
}
