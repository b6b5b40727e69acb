//! MLH season page scraper.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hacksync_core::{
    days_from, parse_date_range, DateConfidence, HackathonMode, HackathonRecord, HackathonSource,
};
use hacksync_storage::HttpFetcher;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::{AdapterContext, AdapterError, AdapterKind, SourceAdapter};

const FALLBACK_REGISTRATION_URL: &str = "https://mlh.io/events";
const DEFAULT_SKILLS: [&str; 4] = ["JavaScript", "Python", "React", "Node.js"];
const ESTIMATED_START_DAYS: i64 = 30;
const ESTIMATED_LENGTH_DAYS: i64 = 2;

#[derive(Debug, Clone)]
pub struct MlhAdapter {
    events_url: String,
}

impl MlhAdapter {
    pub fn new(events_url: impl Into<String>) -> Self {
        Self {
            events_url: events_url.into(),
        }
    }

    async fn try_fetch(
        &self,
        http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Vec<HackathonRecord>, AdapterError> {
        let html = http.get_text(HackathonSource::Mlh.as_str(), &self.events_url).await?;
        parse_events(&html, &self.events_url, ctx.now)
    }
}

#[async_trait]
impl SourceAdapter for MlhAdapter {
    fn source(&self) -> HackathonSource {
        HackathonSource::Mlh
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Scraper
    }

    async fn fetch(&self, http: &HttpFetcher, ctx: &AdapterContext) -> Vec<HackathonRecord> {
        match self.try_fetch(http, ctx).await {
            Ok(records) => {
                if records.is_empty() {
                    warn!(
                        run_id = %ctx.run_id,
                        url = %self.events_url,
                        "mlh page yielded no events; markup may have changed"
                    );
                }
                info!(run_id = %ctx.run_id, count = records.len(), "fetched mlh hackathons");
                records
            }
            Err(err) => {
                warn!(run_id = %ctx.run_id, error = %err, "mlh scrape failed");
                Vec::new()
            }
        }
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Parse(e.to_string()))
}

fn first_text(block: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    block
        .select(sel)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_attr(block: &ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    block
        .select(sel)
        .next()
        .and_then(|n| n.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn absolutize(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn infer_mode(block_html: &str, location: Option<&str>) -> HackathonMode {
    let block = block_html.to_ascii_lowercase();
    let location = location.unwrap_or_default().to_ascii_lowercase();
    let is_digital = |text: &str| ["digital", "online", "virtual"].iter().any(|k| text.contains(k));

    if block.contains("hybrid") {
        HackathonMode::Hybrid
    } else if is_digital(&block) || is_digital(&location) {
        HackathonMode::Online
    } else {
        HackathonMode::Offline
    }
}

/// Extracts one record per `.event-wrapper` block. Blocks without a name or a
/// date are skipped. When the date text cannot be placed on the calendar the
/// record gets estimated dates and `DateConfidence::Estimated`.
pub fn parse_events(
    html: &str,
    page_url: &str,
    now: DateTime<Utc>,
) -> Result<Vec<HackathonRecord>, AdapterError> {
    let document = Html::parse_document(html);
    let block_sel = selector(".event-wrapper")?;
    let name_sel = selector(".event-name")?;
    let date_sel = selector(".event-date")?;
    let location_sel = selector(".event-location")?;
    let link_sel = selector("a.event-link[href]")?;
    let image_sel = selector("img.event-logo[src]")?;

    let mut records = Vec::new();
    for block in document.select(&block_sel) {
        let (Some(title), Some(date_text)) =
            (first_text(&block, &name_sel), first_text(&block, &date_sel))
        else {
            continue;
        };
        let location = first_text(&block, &location_sel);
        let registration_url = first_attr(&block, &link_sel, "href")
            .map(|href| absolutize(page_url, &href))
            .unwrap_or_else(|| FALLBACK_REGISTRATION_URL.to_string());
        let image_url = first_attr(&block, &image_sel, "src").map(|src| absolutize(page_url, &src));
        let mode = infer_mode(&block.html(), location.as_deref());

        let (start_date, end_date, date_confidence) = match parse_date_range(&date_text) {
            Some(range) => (range.start, range.end, DateConfidence::Parsed),
            None => {
                let start = days_from(now, ESTIMATED_START_DAYS);
                (start, start + Duration::days(ESTIMATED_LENGTH_DAYS), DateConfidence::Estimated)
            }
        };

        records.push(HackathonRecord {
            description: Some(format!(
                "Join {title} - an MLH hackathon event. \
                 Build something amazing with fellow developers!"
            )),
            title,
            start_date,
            end_date,
            registration_deadline: start_date,
            registration_url,
            source: HackathonSource::Mlh,
            mode,
            location,
            prize_pool: None,
            image_url,
            skills: DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect(),
            date_confidence,
        });
    }

    Ok(records)
}
