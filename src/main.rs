use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = todosync::cli::Cli::parse();
    todosync::run_blocking(cli)
}
