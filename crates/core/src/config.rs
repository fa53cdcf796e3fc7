use std::env;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::query::DEFAULT_LIMIT;

static DEFAULT_API_URL: &str = "https://be-todolist.vercel.app";
static ENV_API_URL: &str = "TODOSYNC_API_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETAINED_QUERIES: usize = 4;
const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct AppConfig {
    api_base_url: String,
    page_limit: u32,
    request_timeout: Duration,
    retained_queries: usize,
    search_debounce: Duration,
    offline: bool,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the API base URL from the provided
    /// override, the environment, and the built-in default.
    pub fn discover(api_url_override: Option<String>) -> Result<Self> {
        let url = resolve_api_url(api_url_override);
        Self::for_api(url)
    }

    /// Construct [`AppConfig`] for an explicit API base URL.
    pub fn for_api(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            bail!("API URL must start with http:// or https:// (got '{}')", url);
        }
        Ok(Self {
            api_base_url: trimmed.to_string(),
            page_limit: DEFAULT_LIMIT,
            request_timeout: DEFAULT_TIMEOUT,
            retained_queries: DEFAULT_RETAINED_QUERIES,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            offline: false,
        })
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retained_queries(mut self, retained: usize) -> Self {
        self.retained_queries = retained.max(1);
        self
    }

    /// Serve mock data from the start instead of waiting for a failure.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retained_queries(&self) -> usize {
        self.retained_queries
    }

    pub fn search_debounce(&self) -> Duration {
        self.search_debounce
    }

    pub fn offline(&self) -> bool {
        self.offline
    }
}

fn resolve_api_url(api_url_override: Option<String>) -> String {
    if let Some(url) = api_url_override.filter(|url| !url.trim().is_empty()) {
        return url;
    }

    if let Ok(env_url) = env::var(ENV_API_URL) {
        if !env_url.trim().is_empty() {
            return env_url;
        }
    }

    DEFAULT_API_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_and_trailing_slash_is_dropped() {
        let config = AppConfig::discover(Some("http://localhost:4000/".into())).unwrap();
        assert_eq!(config.api_base_url(), "http://localhost:4000");
        assert_eq!(config.page_limit(), DEFAULT_LIMIT);
        assert!(!config.offline());
    }

    #[test]
    fn rejects_urls_without_scheme() {
        assert!(AppConfig::for_api("localhost:4000").is_err());
    }

    #[test]
    fn builders_clamp_to_sane_minimums() {
        let config = AppConfig::for_api(DEFAULT_API_URL)
            .unwrap()
            .with_page_limit(0)
            .with_retained_queries(0)
            .with_offline(true);
        assert_eq!(config.page_limit(), 1);
        assert_eq!(config.retained_queries(), 1);
        assert!(config.offline());
    }
}
