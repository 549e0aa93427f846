//! Command-line interface, parsed with clap.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Local cache of anime, episode and file metadata
#[derive(Parser)]
#[command(name = "anidb-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Show the episode numbers and title query guessed from file names
    #[command(alias = "ep")]
    Episodes {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show row counts of the local cache
    #[command(alias = "stats")]
    Cache,
}

pub use commands::*;
