//! Runtime configuration, read from the environment once at startup.

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

use anyhow::Context;

use crate::filter::FilterState;

/// Default backend base URL if not specified via environment variable.
const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Default HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for talking to the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub page_size: u32,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read `CIVICWATCH_API_URL`, `CIVICWATCH_TOKEN`, `CIVICWATCH_PAGE_SIZE`
    /// and `CIVICWATCH_TIMEOUT_SECS`, falling back to defaults when unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_url = env::var("CIVICWATCH_API_URL").unwrap_or(defaults.api_url);
        let token = env::var("CIVICWATCH_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let page_size = match env::var("CIVICWATCH_PAGE_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("CIVICWATCH_PAGE_SIZE must be a positive integer, got '{raw}'"))?,
            Err(_) => defaults.page_size,
        };

        let timeout = match env::var("CIVICWATCH_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("CIVICWATCH_TIMEOUT_SECS must be an integer, got '{raw}'"))?,
            ),
            Err(_) => defaults.timeout,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            page_size,
            timeout,
        })
    }
}

/// What the headless binary should sync and show.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Keep requesting pages until the backend runs out.
    pub load_all: bool,
    pub filters: FilterState,
}

impl SyncOptions {
    /// Read `CIVICWATCH_LOAD_ALL`, `CIVICWATCH_SEARCH` and the comma-separated
    /// `CIVICWATCH_PRIORITY`, `CIVICWATCH_STATUS`, `CIVICWATCH_CATEGORY` sets.
    pub fn from_env() -> Self {
        let load_all = env::var("CIVICWATCH_LOAD_ALL")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut filters = FilterState::new().with_search(env::var("CIVICWATCH_SEARCH").unwrap_or_default());
        filters.priorities = list_var("CIVICWATCH_PRIORITY");
        filters.statuses = list_var("CIVICWATCH_STATUS");
        filters.categories = list_var("CIVICWATCH_CATEGORY");

        Self { load_all, filters }
    }
}

fn list_var(name: &str) -> BTreeSet<String> {
    env::var(name).map(|raw| split_list(&raw)).unwrap_or_default()
}

fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
