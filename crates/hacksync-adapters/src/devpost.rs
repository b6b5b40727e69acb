use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hacksync_core::{
    format_prize, non_blank, parse_date_range, DateConfidence, HackathonMode, HackathonRecord,
    HackathonSource,
};
use hacksync_storage::HttpFetcher;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{fallback, json_amount, theme_names, AdapterContext, AdapterKind, SourceAdapter, Theme};

#[derive(Debug, Deserialize)]
pub(crate) struct ListingResponse {
    #[serde(default)]
    hackathons: Vec<DevpostHackathon>,
}

#[derive(Debug, Deserialize)]
struct DevpostHackathon {
    #[serde(default)]
    title: String,
    tagline: Option<String>,
    submission_period_dates: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    online_only: bool,
    location: Option<Location>,
    displayed_location: Option<Location>,
    #[serde(default)]
    prize_amount: serde_json::Value,
    thumbnail_url: Option<String>,
    #[serde(default)]
    themes: Vec<Theme>,
}

/// `location` fields show up as plain strings or `{ "icon": .., "location": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Location {
    Text(String),
    Labelled { location: Option<String> },
}

impl Location {
    fn into_text(self) -> Option<String> {
        match self {
            Location::Text(text) => non_blank(Some(text)),
            Location::Labelled { location } => non_blank(location),
        }
    }
}

/// Live Devpost listing client. Falls back to the curated dataset on any failure.
#[derive(Debug, Clone)]
pub struct DevpostAdapter {
    listing_url: String,
}

impl DevpostAdapter {
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for DevpostAdapter {
    fn source(&self) -> HackathonSource {
        HackathonSource::Devpost
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::JsonApi
    }

    async fn fetch(&self, http: &HttpFetcher, ctx: &AdapterContext) -> Vec<HackathonRecord> {
        match http
            .get_json::<ListingResponse>(HackathonSource::Devpost.as_str(), &self.listing_url)
            .await
        {
            Ok(response) => {
                let records = map_response(response, ctx.now);
                info!(run_id = %ctx.run_id, count = records.len(), "fetched devpost hackathons");
                records
            }
            Err(err) => {
                warn!(
                    run_id = %ctx.run_id,
                    error = %err,
                    "devpost api unavailable; using fallback dataset"
                );
                fallback::devpost(ctx.now)
            }
        }
    }
}

pub(crate) fn map_response(response: ListingResponse, now: DateTime<Utc>) -> Vec<HackathonRecord> {
    response
        .hackathons
        .into_iter()
        .map(|item| to_record(item, now))
        .collect()
}

fn to_record(item: DevpostHackathon, now: DateTime<Utc>) -> HackathonRecord {
    // The listing only exposes the submission window; its opening doubles as the deadline.
    let period = item.submission_period_dates.as_deref().and_then(parse_date_range);
    let (start_date, end_date, date_confidence) = match period {
        Some(range) => (range.start, range.end, DateConfidence::Parsed),
        None => (now, now, DateConfidence::Estimated),
    };

    let location = item
        .location
        .and_then(Location::into_text)
        .or_else(|| item.displayed_location.and_then(Location::into_text));
    let image_url = item.thumbnail_url.map(|url| match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url,
    });

    HackathonRecord {
        title: item.title,
        description: item.tagline,
        start_date,
        end_date,
        registration_deadline: start_date,
        registration_url: item.url,
        source: HackathonSource::Devpost,
        mode: HackathonMode::from_online_flag(item.online_only),
        location,
        prize_pool: json_amount(&item.prize_amount).map(|amount| format_prize("$", amount)),
        image_url,
        skills: theme_names(item.themes),
        date_confidence,
    }
}
