//! CLI module for the cache process
//!
//! Provides subcommands:
//! - `run`: build the shared cache and report stats until shutdown (default)
//! - `config`: print the resolved configuration

pub mod run;

use clap::{Parser, Subcommand};

/// In-process cache with TTL, stale-while-revalidate and tag invalidation
#[derive(Parser)]
#[command(name = "inmem-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the shared cache and report stats until shutdown
    Run,

    /// Print the resolved configuration as JSON
    Config,
}
