pub mod cli;
pub mod commands;
pub mod config;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

pub use todosync_core as core;
pub use todosync_core::model;
pub use todosync_core::{AppConfig, TodoSync};

use crate::cli::Cli;

/// Resolve configuration from the parsed command line and run its command,
/// writing to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.clone())?;

    let config = config::from_cli(&cli)?;
    tracing::debug!(
        api = config.api_base_url(),
        offline = config.offline(),
        "starting todosync"
    );
    let sync = TodoSync::from_config(&config)?;

    let stdout = std::io::stdout();
    let handle = stdout.lock();
    commands::execute(&sync, cli.command, handle).await
}

/// Run the command line by creating an internal Tokio runtime.
pub fn run_blocking(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(cli))
}

fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "warn".to_string());
    let directive: Directive = filter
        .parse()
        .with_context(|| format!("invalid log directive '{filter}'"))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
