//! Gate between adapter output and the datastore.

use thiserror::Error;
use url::Url;

use crate::{non_blank, HackathonRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("title is empty")]
    EmptyTitle,
    #[error("registration url {0:?} is not an absolute http(s) url")]
    InvalidRegistrationUrl(String),
    #[error("image url {0:?} is not an absolute http(s) url")]
    InvalidImageUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(HackathonRecord),
    Rejected {
        record: HackathonRecord,
        reason: RejectReason,
    },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

/// Trims and normalizes the record, then checks the fields the datastore and
/// the client rely on. Date ordering is not checked.
pub fn validate_record(mut record: HackathonRecord) -> Validation {
    record.title = record.title.trim().to_string();
    record.registration_url = record.registration_url.trim().to_string();
    record.description = non_blank(record.description.take());
    record.location = non_blank(record.location.take());
    record.prize_pool = non_blank(record.prize_pool.take());
    record.image_url = non_blank(record.image_url.take());
    record.skills.retain(|skill| !skill.trim().is_empty());

    let reason = if record.title.is_empty() {
        Some(RejectReason::EmptyTitle)
    } else if !is_http_url(&record.registration_url) {
        Some(RejectReason::InvalidRegistrationUrl(record.registration_url.clone()))
    } else {
        match record.image_url.as_deref() {
            Some(image) if !is_http_url(image) => {
                Some(RejectReason::InvalidImageUrl(image.to_string()))
            }
            _ => None,
        }
    };

    match reason {
        Some(reason) => Validation::Rejected { record, reason },
        None => Validation::Valid(record),
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}
