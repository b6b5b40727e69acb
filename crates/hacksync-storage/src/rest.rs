use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use hacksync_core::{HackathonRecord, StoredHackathon};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{ActiveQuery, HackathonStore, StoreError, UpsertOutcome};

/// Backend for a hosted Postgres exposed through a PostgREST-compatible API.
///
/// Upserts go through the `upsert_hackathon` SQL function shipped in
/// `migrations/`, so the key check and the write are one statement server-side.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Serialize)]
struct UpsertCall<'a> {
    payload: UpsertPayload<'a>,
}

#[derive(Debug, Serialize)]
struct UpsertPayload<'a> {
    #[serde(flatten)]
    record: &'a HackathonRecord,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    #[allow(dead_code)]
    id: uuid::Uuid,
}

impl RestStore {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        if base_url.trim().is_empty() {
            return Err(StoreError::NotConfigured("datastore base url is empty".into()));
        }
        if service_key.trim().is_empty() {
            return Err(StoreError::NotConfigured("service credential is empty".into()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/hackathons", self.base_url)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.base_url)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

fn timestamp_param(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl HackathonStore for RestStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    async fn upsert(
        &self,
        record: &HackathonRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let call = UpsertCall {
            payload: UpsertPayload {
                record,
                updated_at: now,
            },
        };
        let resp = self
            .authed(self.client.post(self.rpc_url("upsert_hackathon")))
            .json(&call)
            .send()
            .await?;
        let inserted: bool = ensure_success(resp).await?.json().await?;
        debug!(title = %record.title, source = %record.source, inserted, "upserted via rpc");
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let deadline_filter = format!("lt.{}", timestamp_param(now));
        let resp = self
            .authed(self.client.patch(self.table_url()))
            .query(&[
                ("is_active", "eq.true"),
                ("registration_deadline", deadline_filter.as_str()),
                ("select", "id"),
            ])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "is_active": false }))
            .send()
            .await?;
        let flipped: Vec<IdOnly> = ensure_success(resp).await?.json().await?;
        Ok(flipped.len() as u64)
    }

    async fn list_active(
        &self,
        query: &ActiveQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredHackathon>, StoreError> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("is_active", "eq.true".to_string()),
            ("registration_deadline", format!("gte.{}", timestamp_param(now))),
            ("order", "registration_deadline.asc".to_string()),
        ];
        if let Some(source) = query.source {
            params.push(("source", format!("eq.{source}")));
        }
        if let Some(mode) = query.mode {
            params.push(("mode", format!("eq.{mode}")));
        }

        let resp = self
            .authed(self.client.get(self.table_url()))
            .query(&params)
            .send()
            .await?;
        let text = ensure_success(resp).await?.text().await?;
        serde_json::from_str(&text).map_err(|e| StoreError::InvalidRow(e.to_string()))
    }
}
