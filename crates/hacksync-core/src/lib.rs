//! Canonical hackathon model shared by adapters, the sync pipeline and the web layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod dates;
pub mod validate;

pub use dates::{parse_date_range, parse_timestamp, DateRange};
pub use validate::{validate_record, RejectReason, Validation};

pub const CRATE_NAME: &str = "hacksync-core";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Platform a listing was collected from. Closed set; the database enum mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HackathonSource {
    Mlh,
    Devfolio,
    Unstop,
    Devpost,
    Community,
}

impl HackathonSource {
    pub const ALL: [HackathonSource; 5] = [
        HackathonSource::Mlh,
        HackathonSource::Devfolio,
        HackathonSource::Unstop,
        HackathonSource::Devpost,
        HackathonSource::Community,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HackathonSource::Mlh => "mlh",
            HackathonSource::Devfolio => "devfolio",
            HackathonSource::Unstop => "unstop",
            HackathonSource::Devpost => "devpost",
            HackathonSource::Community => "community",
        }
    }
}

impl fmt::Display for HackathonSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HackathonSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HackathonSource::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "hackathon source",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HackathonMode {
    Online,
    Offline,
    Hybrid,
}

impl HackathonMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HackathonMode::Online => "online",
            HackathonMode::Offline => "offline",
            HackathonMode::Hybrid => "hybrid",
        }
    }

    pub fn from_online_flag(is_online: bool) -> Self {
        if is_online {
            HackathonMode::Online
        } else {
            HackathonMode::Offline
        }
    }
}

impl fmt::Display for HackathonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HackathonMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(HackathonMode::Online),
            "offline" => Ok(HackathonMode::Offline),
            "hybrid" => Ok(HackathonMode::Hybrid),
            _ => Err(ParseEnumError {
                kind: "hackathon mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Whether the record's dates came from the source or were filled in by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateConfidence {
    #[default]
    Parsed,
    Estimated,
}

/// Normalized handoff contract from adapters into the sync pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackathonRecord {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub registration_url: String,
    pub source: HackathonSource,
    pub mode: HackathonMode,
    pub location: Option<String>,
    pub prize_pool: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub date_confidence: DateConfidence,
}

impl HackathonRecord {
    pub fn natural_key(&self) -> (&str, HackathonSource) {
        (self.title.as_str(), self.source)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline < now
    }

    /// Best-effort numeric reading of the free-text prize, used only for ordering.
    pub fn prize_value(&self) -> Option<f64> {
        self.prize_pool.as_deref().and_then(leading_amount)
    }
}

/// Persisted row: the record plus server-managed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHackathon {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: HackathonRecord,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn days_from(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}

pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Formats an amount with en-US digit grouping, e.g. `1250000` -> `1,250,000`.
pub fn group_thousands(amount: f64) -> String {
    let rounded = (amount * 1000.0).round() / 1000.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let whole = abs.trunc() as u64;
    let digits = whole.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let fraction = abs - abs.trunc();
    if fraction > 0.0 {
        let frac = format!("{fraction:.3}");
        let frac = frac.trim_start_matches('0').trim_end_matches('0');
        if frac != "." {
            grouped.push_str(frac);
        }
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_prize(currency_symbol: &str, amount: f64) -> String {
    format!("{currency_symbol}{}", group_thousands(amount))
}

/// Reads the first numeric run of `text`, allowing `,` separators and one decimal point.
pub fn leading_amount(text: &str) -> Option<f64> {
    let mut digits = String::new();
    let mut started = false;
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            started = true;
        } else if started && ch == ',' {
            continue;
        } else if started && ch == '.' && !digits.contains('.') {
            digits.push(ch);
        } else if started {
            break;
        }
    }
    digits.trim_end_matches('.').parse().ok()
}
