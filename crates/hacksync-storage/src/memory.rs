use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hacksync_core::{HackathonRecord, HackathonSource, StoredHackathon};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{ActiveQuery, HackathonStore, StoreError, UpsertOutcome};

/// Process-local backend. The key check and the write happen under one lock, so
/// concurrent upserts of the same key never produce two rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredHackathon>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self) -> Vec<StoredHackathon> {
        self.rows.lock().await.clone()
    }

    pub async fn get(&self, title: &str, source: HackathonSource) -> Option<StoredHackathon> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|row| row.record.natural_key() == (title, source))
            .cloned()
    }

    pub async fn seed(&self, row: StoredHackathon) {
        self.rows.lock().await.push(row);
    }
}

#[async_trait]
impl HackathonStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn upsert(
        &self,
        record: &HackathonRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.record.natural_key() == record.natural_key())
        {
            row.record = record.clone();
            row.updated_at = now;
            return Ok(UpsertOutcome::Updated);
        }

        rows.push(StoredHackathon {
            id: Uuid::new_v4(),
            record: record.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().await;
        let mut flipped = 0;
        for row in rows.iter_mut().filter(|row| row.is_active && row.record.is_expired(now)) {
            row.is_active = false;
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn list_active(
        &self,
        query: &ActiveQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredHackathon>, StoreError> {
        let rows = self.rows.lock().await;
        let mut out = rows
            .iter()
            .filter(|row| row.is_active && !row.record.is_expired(now))
            .filter(|row| query.source.map_or(true, |source| row.record.source == source))
            .filter(|row| query.mode.map_or(true, |mode| row.record.mode == mode))
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|row| row.record.registration_deadline);
        Ok(out)
    }
}
