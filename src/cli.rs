use clap::{Parser, Subcommand, ValueEnum};
use scenecatalog_common::MediaKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scenecatalog")]
#[command(author, version, about = "Media catalog scanner and metadata matcher")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the configured share and resolve metadata for new items
    Scan {
        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a release name and display the extracted fields
    Parse {
        /// File or folder name to parse
        #[arg(required = true)]
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List catalog items
    Items {
        /// Only show items of this kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Only show items without accepted metadata
        #[arg(long)]
        unresolved: bool,
    },

    /// List items that share a fingerprint
    Duplicates,

    /// Show recent scan runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Movie,
    Tv,
    Unknown,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Movie => MediaKind::Movie,
            KindArg::Tv => MediaKind::Tv,
            KindArg::Unknown => MediaKind::Unknown,
        }
    }
}
