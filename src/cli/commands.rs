//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: start a mission and follow it to the end
//! - status: progress of a mission
//! - results: files and metrics a mission produced
//! - list: all known missions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeroforge - generate, simulate and refine airframes from a mission prompt
#[derive(Parser, Debug)]
#[command(name = "aeroforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a mission in the foreground
    Run {
        /// Mission description, e.g. "heavy-lift cargo drone for 20kg"
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Override the iteration budget
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Use template designs when no designer is configured
        #[arg(long)]
        offline: bool,
    },

    /// Show the progress of a mission
    Status {
        /// Mission ID
        id: String,
    },

    /// Show files and metrics produced by a mission
    Results {
        /// Mission ID
        id: String,
    },

    /// List all missions
    List,
}
