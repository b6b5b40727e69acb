//! Source adapter contracts + live, scraped and static adapter implementations.
//!
//! Every adapter folds normalization into its fetch and never fails: errors are
//! logged and degrade to an empty list (scraper) or the source's fallback dataset.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hacksync_core::{leading_amount, HackathonRecord, HackathonSource};
use hacksync_storage::{FetchError, HttpFetcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod devfolio;
pub mod devpost;
pub mod fallback;
pub mod mlh;

pub use devfolio::DevfolioAdapter;
pub use devpost::DevpostAdapter;
pub use fallback::StaticAdapter;
pub use mlh::MlhAdapter;

pub const CRATE_NAME: &str = "hacksync-adapters";

pub const MLH_EVENTS_URL: &str = "https://mlh.io/seasons/2025/events";
pub const DEVFOLIO_SEARCH_URL: &str = "https://api.devfolio.co/api/search/hackathons";
pub const DEVPOST_API_URL: &str = "https://devpost.com/api/hackathons?status=upcoming&status=open";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Scraper,
    JsonApi,
    Static,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::Scraper => "scraper",
            AdapterKind::JsonApi => "json_api",
            AdapterKind::Static => "static",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterContext {
    pub run_id: Uuid,
    pub now: DateTime<Utc>,
}

impl AdapterContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            now,
        }
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Parse(String),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> HackathonSource;
    fn kind(&self) -> AdapterKind;

    /// Best-effort list of normalized records. Never fails.
    async fn fetch(&self, http: &HttpFetcher, ctx: &AdapterContext) -> Vec<HackathonRecord>;
}

/// Builds the adapter for `source`, pointing live adapters at `endpoint` when given.
pub fn adapter_for_source(
    source: HackathonSource,
    endpoint: Option<&str>,
) -> Box<dyn SourceAdapter> {
    match source {
        HackathonSource::Mlh => Box::new(MlhAdapter::new(endpoint.unwrap_or(MLH_EVENTS_URL))),
        HackathonSource::Devfolio => {
            Box::new(DevfolioAdapter::new(endpoint.unwrap_or(DEVFOLIO_SEARCH_URL)))
        }
        HackathonSource::Devpost => {
            Box::new(DevpostAdapter::new(endpoint.unwrap_or(DEVPOST_API_URL)))
        }
        HackathonSource::Unstop => Box::new(StaticAdapter::unstop()),
        HackathonSource::Community => Box::new(StaticAdapter::community()),
    }
}

/// Tag entries arrive either as bare strings or as `{ "name": ... }` objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Theme {
    Name(String),
    Named { name: String },
    Other(serde::de::IgnoredAny),
}

impl Theme {
    pub(crate) fn into_name(self) -> Option<String> {
        match self {
            Theme::Name(name) | Theme::Named { name } => Some(name),
            Theme::Other(_) => None,
        }
    }
}

pub(crate) fn theme_names(themes: Vec<Theme>) -> Vec<String> {
    themes.into_iter().filter_map(Theme::into_name).collect()
}

/// Reads a prize amount that may be a JSON number or a string with markup and separators.
/// Zero and amounts missing from the text count as no prize.
pub(crate) fn json_amount(value: &serde_json::Value) -> Option<f64> {
    let amount = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => leading_amount(&strip_markup(s)),
        _ => None,
    }?;
    (amount > 0.0).then_some(amount)
}

fn strip_markup(text: &str) -> String {
    let mut in_tag = false;
    let mut plain = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag => {}
            c => plain.push(c),
        }
    }
    plain
}
