use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Prepare EPUB books for upload to a group and confirm their transactions
#[derive(Parser, Debug)]
#[command(name = "epub-share", version, about)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./epub-share.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse an EPUB into its upload manifest and segments
    Parse {
        /// Path to the input EPUB file
        input: PathBuf,

        /// Print the manifest as JSON instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write the cover image here, if the book has one
        #[arg(long)]
        cover_out: Option<PathBuf>,

        /// Write each segment to <DIR>/seg-N.bin and the manifest to <DIR>/fileinfo.json
        #[arg(long)]
        segments_dir: Option<PathBuf>,
    },

    /// Show descriptive metadata and upload details for an EPUB
    Info {
        /// Path to the input EPUB file
        input: PathBuf,
    },

    /// Reassemble a segment directory and check it against its manifest
    Verify {
        /// Directory containing seg-N.bin files
        dir: PathBuf,

        /// Manifest JSON (defaults to <DIR>/fileinfo.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Write the reassembled book here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Wait until a submitted transaction is visible on the node
    Wait {
        /// Group the transaction was posted to
        #[arg(long)]
        group: String,

        /// Transaction id
        #[arg(long)]
        trx: String,

        /// Node API base URL (overrides config)
        #[arg(long)]
        node: Option<String>,

        /// Stop after this many fetch attempts (0 = unbounded)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Give up after this many seconds (0 = unbounded)
        #[arg(long)]
        timeout: Option<u64>,
    },
}
