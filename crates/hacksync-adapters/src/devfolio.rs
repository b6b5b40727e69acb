use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hacksync_core::{
    format_prize, non_blank, parse_timestamp, DateConfidence, HackathonMode, HackathonRecord,
    HackathonSource,
};
use hacksync_storage::HttpFetcher;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{fallback, json_amount, theme_names, AdapterContext, AdapterKind, SourceAdapter, Theme};

const PAGE_SIZE: u32 = 50;

#[derive(Debug, Serialize)]
struct SearchRequest {
    #[serde(rename = "type")]
    kind: &'static str,
    from: u32,
    size: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    hits: Option<Hits>,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: DevfolioHackathon,
}

#[derive(Debug, Deserialize)]
struct DevfolioHackathon {
    #[serde(default)]
    name: String,
    desc: Option<String>,
    tagline: Option<String>,
    starts_at: Option<String>,
    ends_at: Option<String>,
    reg_ends_at: Option<String>,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    is_online: bool,
    location: Option<String>,
    #[serde(default)]
    prize_pool: serde_json::Value,
    logo: Option<String>,
    #[serde(default)]
    themes: Vec<Theme>,
}

/// Live Devfolio search client. Falls back to the curated dataset on any failure.
#[derive(Debug, Clone)]
pub struct DevfolioAdapter {
    search_url: String,
}

impl DevfolioAdapter {
    pub fn new(search_url: impl Into<String>) -> Self {
        Self {
            search_url: search_url.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for DevfolioAdapter {
    fn source(&self) -> HackathonSource {
        HackathonSource::Devfolio
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::JsonApi
    }

    async fn fetch(&self, http: &HttpFetcher, ctx: &AdapterContext) -> Vec<HackathonRecord> {
        let request = SearchRequest {
            kind: "application_open",
            from: 0,
            size: PAGE_SIZE,
        };
        let source = HackathonSource::Devfolio.as_str();
        match http.post_json::<_, SearchResponse>(source, &self.search_url, &request).await {
            Ok(response) => {
                let records = map_response(response, ctx.now);
                info!(run_id = %ctx.run_id, count = records.len(), "fetched devfolio hackathons");
                records
            }
            Err(err) => {
                warn!(
                    run_id = %ctx.run_id,
                    error = %err,
                    "devfolio api unavailable; using fallback dataset"
                );
                fallback::devfolio(ctx.now)
            }
        }
    }
}

pub(crate) fn map_response(response: SearchResponse, now: DateTime<Utc>) -> Vec<HackathonRecord> {
    response
        .hits
        .map(|hits| hits.hits)
        .unwrap_or_default()
        .into_iter()
        .map(|hit| to_record(hit.source, now))
        .collect()
}

fn to_record(item: DevfolioHackathon, now: DateTime<Utc>) -> HackathonRecord {
    let mut confidence = DateConfidence::Parsed;
    let mut timestamp = |raw: Option<&str>| match raw.and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            confidence = DateConfidence::Estimated;
            now
        }
    };

    let start_date = timestamp(item.starts_at.as_deref());
    let end_date = timestamp(item.ends_at.as_deref());
    let registration_deadline =
        timestamp(item.reg_ends_at.as_deref().or(item.starts_at.as_deref()));

    HackathonRecord {
        title: item.name,
        description: non_blank(item.desc).or_else(|| non_blank(item.tagline)),
        start_date,
        end_date,
        registration_deadline,
        registration_url: format!("https://{}.devfolio.co", item.slug),
        source: HackathonSource::Devfolio,
        mode: HackathonMode::from_online_flag(item.is_online),
        location: item.location,
        prize_pool: json_amount(&item.prize_pool).map(|amount| format_prize("₹", amount)),
        image_url: item.logo,
        skills: theme_names(item.themes),
        date_confidence: confidence,
    }
}
