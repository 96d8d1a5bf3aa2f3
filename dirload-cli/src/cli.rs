//! CLI definition for the dirload command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// How loaded values are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// dirload - load a directory tree into one structured document
#[derive(Parser, Debug)]
#[command(name = "dirload")]
#[command(version)]
#[command(about = "Load a directory tree of JSON, YAML, TOML and text files into one document")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a directory into one document
    Load {
        /// Directory to load
        dir: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Fail when an entry is not handled by any loader
        #[arg(long)]
        strict: bool,

        /// Produce an array indexed by numeric file names instead of an object
        #[arg(long)]
        array: bool,

        /// Deep-merge objects that end up under the same key
        #[arg(long)]
        deep_merge: bool,

        /// Concatenate arrays that end up under the same key
        #[arg(long)]
        concat_arrays: bool,

        /// Percent-decode file names before using them as keys
        #[arg(long)]
        decode_names: bool,

        /// Follow symbolic links
        #[arg(long)]
        include_symlinks: bool,

        /// Embed each directory's location under this property
        #[arg(long, value_name = "PROPERTY")]
        embed_dir_url: Option<String>,

        /// Embed each file's location under this property of its object
        #[arg(long, value_name = "PROPERTY")]
        embed_file_url: Option<String>,
    },
    /// Load a single file
    File {
        /// File to load
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Print compact JSON on one line
    #[arg(long)]
    pub compact: bool,
}
