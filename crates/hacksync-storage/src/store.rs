use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hacksync_core::{HackathonMode, HackathonRecord, HackathonSource, StoredHackathon};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("datastore is not configured: {0}")]
    NotConfigured(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("datastore request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("datastore returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid row from datastore: {0}")]
    InvalidRow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Filters the backends push down when listing rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveQuery {
    pub source: Option<HackathonSource>,
    pub mode: Option<HackathonMode>,
}

/// Datastore contract for the `hackathons` table.
///
/// `upsert` must be a single conditional write keyed by `(title, source)`: insert
/// with `is_active = true` when absent, otherwise replace every record field and
/// set `updated_at = now`, leaving `is_active` alone.
#[async_trait]
pub trait HackathonStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn upsert(
        &self,
        record: &HackathonRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Flips `is_active` off for active rows whose registration deadline is before `now`.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Active rows whose deadline has not passed, ordered by deadline ascending.
    async fn list_active(
        &self,
        query: &ActiveQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredHackathon>, StoreError>;
}
