//! CLI commands
//!
//! Small operator surface for working with model containers on disk.

mod info;

pub use info::info;

use clap::{Parser, Subcommand};

/// Rewritr - native inference sessions for on-device text rewriting
#[derive(Parser)]
#[command(name = "rewritr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show model container information
    Info {
        /// Model name or path
        model: String,
    },
}
