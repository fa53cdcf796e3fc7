use std::time::Duration;

pub use todosync_core::config::*;

use crate::cli::{Cli, CliCommand};

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::discover(cli.api_url.clone())?.with_offline(cli.offline);
    if let Some(seconds) = cli.timeout {
        config = config.with_request_timeout(Duration::from_secs(seconds));
    }
    if let CliCommand::List(args) = &cli.command {
        if let Some(limit) = args.limit {
            config = config.with_page_limit(limit);
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn list_limit_sets_page_size() {
        let cli = Cli::parse_from([
            "todosync",
            "--api-url",
            "http://localhost:4000/",
            "--offline",
            "list",
            "--limit",
            "3",
        ]);
        let config = from_cli(&cli).expect("config");
        assert_eq!(config.api_base_url(), "http://localhost:4000");
        assert_eq!(config.page_limit(), 3);
        assert!(config.offline());
    }

    #[test]
    fn timeout_flag_sets_request_timeout() {
        let cli = Cli::parse_from(["todosync", "delete", "1", "--timeout", "3"]);
        let config = from_cli(&cli).expect("config");
        assert_eq!(config.request_timeout(), Duration::from_secs(3));

        let cli = Cli::parse_from(["todosync", "delete", "1"]);
        let config = from_cli(&cli).expect("config");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["todosync", "--timeout", "0", "delete", "1"]).is_err());
    }

    #[test]
    fn rejects_non_http_urls() {
        let cli = Cli::parse_from(["todosync", "--api-url", "ftp://example.com", "delete", "1"]);
        assert!(from_cli(&cli).is_err());
    }
}
