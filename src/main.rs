use clap::Parser;
use inmem_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => cli::run::run().await,
        Command::Config => cli::run::print_config(),
    }
}
