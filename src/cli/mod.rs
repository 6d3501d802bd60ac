//! CLI argument definitions for Capstan.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Capstan - configuration capture for build tooling.
///
/// Declare groups of properties in a definition file (or through the
/// library API), capture their values interactively, and read them back in
/// later build steps.
#[derive(Parser, Debug)]
#[command(name = "cap")]
#[command(author, version, about = "Capture, validate and persist project configuration", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human: bool,

    /// Run as if cap was started in <path> instead of the current directory.
    /// Can also be set via CAPSTAN_PROJECT environment variable.
    #[arg(short = 'C', long = "project", global = true, env = "CAPSTAN_PROJECT")]
    pub project: Option<PathBuf>,

    /// Definition file declaring groups and properties
    #[arg(
        short = 'd',
        long = "definition",
        global = true,
        default_value = "capstan.kdl"
    )]
    pub definition: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture input values, then generate the configured output files
    Capture {
        /// Capture input values using the line prompt
        #[arg(long, conflicts_with_all = ["form", "file", "defaults"])]
        prompt: bool,

        /// Capture input values using the desktop form (requires an
        /// installed form surface)
        #[arg(long, conflicts_with_all = ["prompt", "file", "defaults"])]
        form: bool,

        /// Capture input values from a YAML/JSON file
        #[arg(long, conflicts_with_all = ["prompt", "form", "defaults"])]
        file: Option<PathBuf>,

        /// Skip capturing input values (use only defaults)
        #[arg(long, conflicts_with_all = ["prompt", "form", "file"])]
        defaults: bool,

        /// Skip already captured input values (like running the first time)
        #[arg(long)]
        fresh: bool,

        /// Print definitions and values while capturing
        #[arg(long = "debug-config")]
        debug: bool,

        /// Treat cancellation as a failure
        #[arg(long)]
        strict: bool,
    },

    /// Show the captured values
    Show,

    /// Print a single captured value
    Value {
        /// Property name
        prop: String,
    },

    /// Print the snapshot and output file paths
    Paths,
}
