//! Parsing for the loose date strings listing sites print.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartialDate {
    month: Option<u32>,
    day: u32,
    year: Option<i32>,
}

/// Parses human ranges such as `Feb 7 - 9, 2025`, `Feb 28 - Mar 2, 2025`,
/// `Dec 30, 2024 - Jan 2, 2025` or a single `Mar 3, 2025`.
///
/// Returns `None` when the text does not carry enough information to place both
/// ends of the range on the calendar.
pub fn parse_date_range(text: &str) -> Option<DateRange> {
    let normalized = text.replace(['\u{2013}', '\u{2014}'], "-");
    let mut parts = normalized.splitn(2, '-').map(str::trim);
    let left = parse_partial(parts.next()?)?;

    let Some(right_text) = parts.next() else {
        let date = to_date(left.year?, left.month?, left.day)?;
        return Some(DateRange {
            start: midnight(date),
            end: midnight(date),
        });
    };

    let right = parse_partial(right_text)?;
    let end_year = right.year?;
    let start_month = left.month?;
    let end_month = right.month.unwrap_or(start_month);
    let start_year = match left.year {
        Some(year) => year,
        None if start_month > end_month => end_year - 1,
        None => end_year,
    };

    let start = to_date(start_year, start_month, left.day)?;
    let end = to_date(end_year, end_month, right.day)?;
    Some(DateRange {
        start: midnight(start),
        end: midnight(end),
    })
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and bare dates.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(midnight)
}

fn parse_partial(text: &str) -> Option<PartialDate> {
    let cleaned = text.replace(',', " ");
    let mut tokens = cleaned.split_whitespace().peekable();

    let month = match tokens.peek() {
        Some(token) => month_from_name(token),
        None => return None,
    };
    if month.is_some() {
        tokens.next();
    }

    let day = tokens.next()?.trim_end_matches(|c: char| c.is_ascii_alphabetic()).parse().ok()?;
    let year = match tokens.next() {
        Some(token) => Some(token.parse().ok()?),
        None => None,
    };
    if tokens.next().is_some() {
        return None;
    }

    Some(PartialDate { month, day, year })
}

fn month_from_name(token: &str) -> Option<u32> {
    let lower = token.trim_end_matches('.').to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|idx| idx as u32 + 1)
}

fn to_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
